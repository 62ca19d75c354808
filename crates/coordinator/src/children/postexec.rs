//! The postexec child: runs an optional user-supplied hook after the syncer
//! exits, passing it the syncer's exit status so the hook can decide (via
//! its own exit status) whether to keep or discard the new snapshot.

use crate::privilege::privdrop;
use ipc::channel::Channel;
use ipc::{read_command, read_custom_payload, Command};
use rotate::SYNC_AREA;
use snapmodel::Endpoint;
use std::os::unix::process::CommandExt;
use std::path::Path;

/// Minimal `PATH` handed to the hook, matching the original's deliberately
/// narrow environment: a postexec hook should not inherit whatever the
/// coordinator happened to have in its own environment.
const MINIMAL_PATH: &str =
    "PATH=/usr/bin:/bin:/usr/sbin:/sbin:/usr/X11R6/bin:/usr/local/bin:/usr/local/sbin";

/// Wait for the go-ahead, then `exec` the configured postexec hook with the
/// syncer's exit status as its only argument. Returns an exit code on any
/// failure before the exec; never returns on success.
pub fn run(endpoint: &Endpoint, local_path: &Path, mut channel: Channel) -> i32 {
    let cmd = match read_command(&mut channel) {
        Ok(cmd) => cmd,
        Err(error) => {
            tracing::error!(%error, "postexec: reading command failed");
            return 1;
        }
    };

    match cmd {
        Command::Stop | Command::Closed => return 0,
        Command::Cust => {}
        other => {
            tracing::error!(?other, "postexec: unexpected command");
            return 1;
        }
    }

    let sync_dir = local_path.join(format!("{SYNC_AREA}.1"));
    if let Err(error) = std::env::set_current_dir(&sync_dir) {
        tracing::error!(%error, dir = %sync_dir.display(), "postexec: chdir into sync area failed");
        return 1;
    }

    if let Err(error) = privdrop(endpoint.uid(), endpoint.gid()) {
        tracing::error!(%error, "postexec: dropping privileges failed");
        return 1;
    }

    let exit_status = match read_custom_payload(&mut channel) {
        Ok(status) => status,
        Err(error) => {
            tracing::error!(%error, "postexec: reading syncer exit status failed");
            return 1;
        }
    };
    drop(channel);

    let Some(hook) = endpoint.postexec() else {
        tracing::error!("postexec: no hook configured");
        return 1;
    };
    let argv0 = Path::new(hook)
        .file_name()
        .map_or_else(|| hook.to_string(), |n| n.to_string_lossy().into_owned());

    let mut envp = vec![MINIMAL_PATH.to_string()];
    if let Ok(Some(user)) = nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(endpoint.uid()))
    {
        envp.push(format!("LOGNAME={}", user.name));
        envp.push(format!("USER={}", user.name));
        envp.push(format!("HOME={}", user.dir.display()));
        envp.push(format!("SHELL={}", user.shell.display()));
    }

    let error = std::process::Command::new(hook)
        .arg0(&argv0)
        .arg(exit_status.to_string())
        .env_clear()
        .envs(envp.iter().filter_map(|kv| kv.split_once('=')))
        .exec();
    tracing::error!(%error, hook, "postexec: exec failed");
    1
}
