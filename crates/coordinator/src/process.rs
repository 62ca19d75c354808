//! Forking a child process connected to the parent over an [`ipc::channel`].

use ipc::channel::{self, Channel};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{ForkResult, Pid};
use std::io;

/// Errors produced while forking or reaping a child process.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// `socketpair` failed.
    #[error("creating command channel: {0}")]
    Channel(#[source] io::Error),
    /// `fork` failed.
    #[error("fork: {0}")]
    Fork(#[source] nix::Error),
    /// `waitpid` failed.
    #[error("waitpid: {0}")]
    Wait(#[source] nix::Error),
}

/// A forked child process and the parent's end of its command channel.
#[derive(Debug)]
pub struct Child {
    /// The child's process id.
    pub pid: Pid,
    /// The parent-side end of the command channel connected to the child.
    pub channel: Channel,
}

/// Fork a child process. The parent gets back a [`Child`] holding the
/// parent's end of a fresh command channel; the child runs `body` with the
/// child's end and then this function does not return to the caller in the
/// child branch (`body` is expected to call [`std::process::exit`]).
///
/// # Safety considerations
///
/// `fork` is `unsafe` in `nix` because forking a multi-threaded process
/// leaves the child in an inconsistent state (only the calling thread
/// survives, but other threads' locks do not release). Every call site in
/// this crate runs before any thread other than the main one has been
/// spawned, matching the single-threaded assumption the original tool's own
/// `fork()` calls made implicitly.
pub fn spawn_child(body: impl FnOnce(Channel) -> !) -> Result<Child, ProcessError> {
    let (parent_end, child_end) = channel::pair().map_err(ProcessError::Channel)?;

    // SAFETY: the coordinator is single-threaded at every call site; see
    // the doc comment above.
    #[allow(unsafe_code)]
    let fork_result = unsafe { nix::unistd::fork() }.map_err(ProcessError::Fork)?;

    match fork_result {
        ForkResult::Parent { child } => {
            drop(child_end);
            Ok(Child {
                pid: child,
                channel: parent_end,
            })
        }
        ForkResult::Child => {
            drop(parent_end);
            body(child_end)
        }
    }
}

/// Block until `pid` exits and return its exit status, mapping a
/// signal-terminated child to the `128 + signal` convention shells use.
pub fn reap(pid: Pid) -> Result<i32, ProcessError> {
    loop {
        match waitpid(pid, None).map_err(ProcessError::Wait)? {
            WaitStatus::Exited(_, code) => return Ok(code),
            WaitStatus::Signaled(_, signal, _) => return Ok(128 + signal as i32),
            // Stopped/Continued/PtraceEvent/PtraceSyscall can only occur
            // under ptrace or job-control signals this process never
            // sends; keep waiting for the real exit.
            _ => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_child_runs_body_and_parent_observes_its_exit() {
        let child = spawn_child(|_channel| {
            std::process::exit(7);
        })
        .unwrap();

        let status = reap(child.pid).unwrap();
        assert_eq!(status, 7);
    }

    #[test]
    fn parent_and_child_exchange_a_command() {
        use std::io::Write;

        let child = spawn_child(|mut channel| {
            ipc::write_command(&mut channel, ipc::Command::Ready).unwrap();
            std::process::exit(0);
        })
        .unwrap();

        let mut parent_channel = child.channel;
        let cmd = ipc::read_command(&mut parent_channel).unwrap();
        assert_eq!(cmd, ipc::Command::Ready);
        let _ = parent_channel.flush();

        reap(child.pid).unwrap();
    }
}
