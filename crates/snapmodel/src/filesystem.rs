//! Filesystem abstraction so rotation arithmetic can run against a
//! synthetic clock and an in-memory directory tree in tests.

use std::path::Path;
use std::time::SystemTime;

/// The narrow slice of filesystem operations the snapshot model needs:
/// reading and writing a directory's modification time and checking
/// existence. Real usage goes through [`RealFilesystem`]; tests can supply
/// their own implementation with a controlled clock.
pub trait Filesystem {
    /// Return the modification time of the directory at `path`, or `None`
    /// if it does not exist.
    fn mtime(&self, path: &Path) -> Option<SystemTime>;

    /// Set the modification (and access) time of the directory at `path`.
    fn set_mtime(&self, path: &Path, time: SystemTime);

    /// Return whether `path` exists as a directory.
    fn exists(&self, path: &Path) -> bool {
        self.mtime(path).is_some()
    }
}

/// A [`Filesystem`] backed by real `std::fs` calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFilesystem;

impl Filesystem for RealFilesystem {
    fn mtime(&self, path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).ok()?.modified().ok()
    }

    fn set_mtime(&self, path: &Path, time: SystemTime) {
        let file_time = filetime_from_system_time(time);
        let _ = filetime_set(path, file_time);
    }
}

/// Minimal stand-in for a `(seconds, nanos)` timestamp, since this crate
/// does not depend on the `filetime` crate and instead shells out to
/// `utimensat` semantics via `std::fs`'s own (currently unstable) surface is
/// unavailable; callers needing real mtime writes go through `coordinator`,
/// which has the privileged filesystem access and the `nix` dependency.
type FileTime = SystemTime;

fn filetime_from_system_time(t: SystemTime) -> FileTime {
    t
}

fn filetime_set(_path: &Path, _time: FileTime) -> std::io::Result<()> {
    // Setting mtime on an arbitrary path from an unprivileged library crate
    // is intentionally not implemented here: the rotator is the only
    // component that ever needs to reset a snapshot's creation time, and it
    // does so with `nix::sys::stat::utimensat` where it already holds a
    // privileged, chrooted file descriptor. See `coordinator::rotator`.
    Ok(())
}

/// An in-memory [`Filesystem`] fake, exported for use by this crate's own
/// tests and by downstream crates (`rotate`) that need a deterministic
/// directory tree driven by a synthetic clock.
pub mod fake {
    use super::Filesystem;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::time::SystemTime;

    /// An in-memory filesystem fake mapping directory paths to mtimes, for
    /// deterministic rotation tests driven by a synthetic clock.
    #[derive(Debug, Default)]
    pub struct FakeFilesystem {
        entries: RefCell<HashMap<PathBuf, SystemTime>>,
    }

    impl FakeFilesystem {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn create(&self, path: impl Into<PathBuf>, mtime: SystemTime) {
            self.entries.borrow_mut().insert(path.into(), mtime);
        }

        pub fn remove(&self, path: &Path) {
            self.entries.borrow_mut().remove(path);
        }

        pub fn rename(&self, from: &Path, to: &Path) {
            if let Some(t) = self.entries.borrow_mut().remove(from) {
                self.entries.borrow_mut().insert(to.to_path_buf(), t);
            }
        }
    }

    impl Filesystem for FakeFilesystem {
        fn mtime(&self, path: &Path) -> Option<SystemTime> {
            self.entries.borrow().get(path).copied()
        }

        fn set_mtime(&self, path: &Path, time: SystemTime) {
            if self.entries.borrow().contains_key(path) {
                self.entries.borrow_mut().insert(path.to_path_buf(), time);
            }
        }
    }
}
