//! A [`rotate::RotationFs`] backed by real `std::fs` calls, used by the
//! rotator child once it has chrooted into an endpoint's local path.
//!
//! Every path this type is handed is relative to the process's current
//! working directory, which by the time the rotator calls into it is `/`
//! inside the chroot jail — i.e. the endpoint's root on the host side.

use rotate::RotationFs;
use snapmodel::Filesystem;
use std::path::Path;
use std::time::SystemTime;

/// A [`RotationFs`]/[`Filesystem`] implementation operating on the real
/// filesystem relative to the current working directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealRotationFs;

impl Filesystem for RealRotationFs {
    fn mtime(&self, path: &Path) -> Option<SystemTime> {
        std::fs::symlink_metadata(path).ok()?.modified().ok()
    }

    fn set_mtime(&self, path: &Path, time: SystemTime) {
        let ft = filetime::FileTime::from_system_time(time);
        if let Err(error) = filetime::set_file_mtime(path, ft) {
            tracing::warn!(path = %path.display(), %error, "failed to set snapshot mtime");
        }
    }
}

impl RotationFs for RealRotationFs {
    fn rename(&self, from: &Path, to: &Path) {
        if let Err(error) = std::fs::rename(from, to) {
            tracing::warn!(from = %from.display(), to = %to.display(), %error, "rename failed");
        }
    }

    fn remove_tree(&self, path: &Path) {
        if let Err(error) = std::fs::remove_dir_all(path) {
            if error.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), %error, "recursive removal failed");
            }
        }
    }

    fn max_numbered(&self, interval_name: &str) -> u32 {
        let mut n = 0u32;
        loop {
            let candidate = format!("{interval_name}.{}", n + 1);
            if std::fs::symlink_metadata(&candidate).is_ok() {
                n += 1;
            } else {
                break;
            }
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn max_numbered_stops_at_first_gap() {
        let dir = tempfile::tempdir().unwrap();
        let guard = Cwd::enter(dir.path());
        std::fs::create_dir("hourly.1").unwrap();
        std::fs::create_dir("hourly.2").unwrap();
        std::fs::create_dir("hourly.4").unwrap();
        assert_eq!(RealRotationFs.max_numbered("hourly"), 2);
        drop(guard);
    }

    #[test]
    fn mtime_round_trips_through_set_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let guard = Cwd::enter(dir.path());
        std::fs::create_dir("hourly.1").unwrap();
        let when = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        RealRotationFs.set_mtime(Path::new("hourly.1"), when);
        let got = RealRotationFs.mtime(Path::new("hourly.1")).unwrap();
        assert_eq!(
            got.duration_since(SystemTime::UNIX_EPOCH).unwrap().as_secs(),
            1_700_000_000
        );
        drop(guard);
    }

    /// Switches the test process's working directory for the lifetime of
    /// the guard. Coordinator tests are single-threaded with respect to
    /// `cwd`-sensitive assertions, matching how the rotator itself only
    /// ever runs one endpoint per process.
    struct Cwd {
        previous: std::path::PathBuf,
    }

    impl Cwd {
        fn enter(path: &Path) -> Self {
            let previous = std::env::current_dir().unwrap();
            std::env::set_current_dir(path).unwrap();
            Self { previous }
        }
    }

    impl Drop for Cwd {
        fn drop(&mut self) {
            let _ = std::env::set_current_dir(&self.previous);
        }
    }
}
