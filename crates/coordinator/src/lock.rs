//! A whole-file advisory lock guarding one endpoint's rotation pass.
//!
//! The original tool takes a byte-range `fcntl(F_SETLK)` lock and, on
//! contention, uses `F_GETLK` to report the PID already holding it. `nix`
//! does not expose a stable byte-range lock API; this uses a whole-file
//! `flock(2)` instead, which is sufficient here (the lock file is never used
//! for anything but mutual exclusion) at the cost of that contending-PID
//! diagnostic.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;

/// Name of the lock file created inside an endpoint's local path.
pub const LOCK_FILE: &str = ".lock";

/// A held advisory lock on an endpoint's `.lock` file. Released when
/// dropped.
#[derive(Debug)]
pub struct RotationLock {
    file: File,
}

impl RotationLock {
    /// Attempt to acquire the rotation lock in `dir` (the endpoint's local
    /// path), non-blocking. Returns `Ok(None)` if another process already
    /// holds it rather than an error, since "someone else is rotating this
    /// endpoint right now" is an expected, recoverable condition.
    pub fn try_acquire(dir: &Path) -> io::Result<Option<Self>> {
        let path = dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)?;

        // SAFETY: `file`'s raw fd is valid for the duration of the call.
        #[allow(unsafe_code)]
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc == 0 {
            Ok(Some(Self { file }))
        } else {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::WouldBlock {
                Ok(None)
            } else {
                Err(err)
            }
        }
    }
}

impl Drop for RotationLock {
    fn drop(&mut self) {
        // SAFETY: `self.file`'s raw fd is valid; unlocking a lock we hold
        // cannot fail in a way that matters once we are tearing down.
        #[allow(unsafe_code)]
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_second_acquire_attempt_fails_while_the_first_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let first = RotationLock::try_acquire(dir.path()).unwrap();
        assert!(first.is_some());

        let second = RotationLock::try_acquire(dir.path()).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn releasing_the_first_lock_allows_a_new_acquire() {
        let dir = tempfile::tempdir().unwrap();
        let first = RotationLock::try_acquire(dir.path()).unwrap();
        drop(first);

        let second = RotationLock::try_acquire(dir.path()).unwrap();
        assert!(second.is_some());
    }
}
