//! An in-memory [`RotationFs`] for deterministic rotation tests.

use crate::fs::RotationFs;
use snapmodel::Filesystem;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// An in-memory directory tree (just a map from relative path to mtime)
/// driven by a synthetic clock, standing in for a chrooted endpoint root in
/// tests.
#[derive(Debug, Default)]
pub struct FakeRotationFs {
    entries: RefCell<HashMap<PathBuf, SystemTime>>,
}

fn secs(n: i64) -> SystemTime {
    if n >= 0 {
        SystemTime::UNIX_EPOCH + Duration::from_secs(n as u64)
    } else {
        SystemTime::UNIX_EPOCH - Duration::from_secs((-n) as u64)
    }
}

impl FakeRotationFs {
    /// Create an empty fake endpoint root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the well-known sync-area directory (`.sync.1`) with the given
    /// creation time, in seconds since the Unix epoch.
    pub fn create_sync_dir(&self, mtime_secs: i64) {
        self.entries
            .borrow_mut()
            .insert(PathBuf::from(".sync.1"), secs(mtime_secs));
    }

    /// Create `<interval_name>.<number>` with the given creation time.
    pub fn create_numbered(&self, interval_name: &str, number: u32, mtime_secs: i64) {
        self.entries.borrow_mut().insert(
            PathBuf::from(format!("{interval_name}.{number}")),
            secs(mtime_secs),
        );
    }

    /// Whether `<interval_name>.<number>` currently exists.
    pub fn exists_numbered(&self, interval_name: &str, number: u32) -> bool {
        self.entries
            .borrow()
            .contains_key(&PathBuf::from(format!("{interval_name}.{number}")))
    }
}

impl Filesystem for FakeRotationFs {
    fn mtime(&self, path: &Path) -> Option<SystemTime> {
        self.entries.borrow().get(path).copied()
    }

    fn set_mtime(&self, path: &Path, time: SystemTime) {
        self.entries
            .borrow_mut()
            .entry(path.to_path_buf())
            .and_modify(|t| *t = time)
            .or_insert(time);
    }
}

impl RotationFs for FakeRotationFs {
    fn rename(&self, from: &Path, to: &Path) {
        if let Some(t) = self.entries.borrow_mut().remove(from) {
            self.entries.borrow_mut().insert(to.to_path_buf(), t);
        }
    }

    fn remove_tree(&self, path: &Path) {
        self.entries.borrow_mut().remove(path);
    }

    fn max_numbered(&self, interval_name: &str) -> u32 {
        let mut n = 0;
        loop {
            let candidate = PathBuf::from(format!("{interval_name}.{}", n + 1));
            if self.entries.borrow().contains_key(&candidate) {
                n += 1;
            } else {
                break;
            }
        }
        n
    }
}
