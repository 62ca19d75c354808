//! Dropping from the superuser to an endpoint's configured uid/gid.

use nix::unistd::{setgid, setgroups, setuid, Gid, Uid};

/// Errors produced while dropping privileges.
#[derive(Debug, thiserror::Error)]
pub enum PrivilegeError {
    /// The target uid or gid was 0; dropping to the superuser defeats the
    /// whole point of privilege separation.
    #[error("refusing to drop privileges to the superuser (uid {uid}, gid {gid})")]
    TargetIsSuperuser {
        /// The rejected uid.
        uid: u32,
        /// The rejected gid.
        gid: u32,
    },
    /// A `setgroups`/`setgid`/`setuid` call failed.
    #[error("{0}: {1}")]
    Syscall(&'static str, nix::Error),
}

/// Drop the calling process's privileges to `uid`/`gid` for good, in the
/// order that matters: clear supplementary groups, then `setgid`, then
/// `setuid` last (dropping the uid first would make the earlier calls fail
/// once no longer running as root).
///
/// Must be called while still running as the superuser; returns
/// [`PrivilegeError::TargetIsSuperuser`] immediately if either target id is
/// 0, without making any syscall.
pub fn privdrop(uid: u32, gid: u32) -> Result<(), PrivilegeError> {
    if uid == 0 || gid == 0 {
        return Err(PrivilegeError::TargetIsSuperuser { uid, gid });
    }

    let gid = Gid::from_raw(gid);
    setgroups(&[gid]).map_err(|e| PrivilegeError::Syscall("setgroups", e))?;
    setgid(gid).map_err(|e| PrivilegeError::Syscall("setgid", e))?;
    setuid(Uid::from_raw(uid)).map_err(|e| PrivilegeError::Syscall("setuid", e))?;

    Ok(())
}
