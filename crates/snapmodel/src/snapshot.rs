//! A single numbered snapshot slot and its TTL arithmetic.

use crate::filesystem::Filesystem;
use crate::interval::Interval;
use crate::{ModelError, Result};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// A reference to one numbered slot (`<interval>.<number>`) within an
/// endpoint's root. Does not itself record whether the slot exists on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    interval_name: String,
    number: u32,
}

impl Snapshot {
    /// Build a reference to slot `number` of the interval named
    /// `interval_name`. `number` must be at least 1.
    pub fn new(interval_name: impl Into<String>, number: u32) -> Result<Self> {
        if number < 1 {
            return Err(ModelError::InvalidNumber(i64::from(number)));
        }
        Ok(Self {
            interval_name: interval_name.into(),
            number,
        })
    }

    /// The interval this snapshot belongs to.
    pub fn interval_name(&self) -> &str {
        &self.interval_name
    }

    /// The 1-based position within the interval.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// The on-disk directory name for this slot, e.g. `hourly.3`.
    pub fn dir_name(&self) -> String {
        format!("{}.{}", self.interval_name, self.number)
    }

    /// The path to this slot relative to the endpoint root.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.dir_name())
    }
}

/// Compute the number of seconds before `snapshot` expires, and report its
/// current age via `age_out`.
///
/// `now` is the reference time (tests pass a synthetic clock value).
/// `fs.mtime` looks up when the slot's directory was created; if it does not
/// exist, this returns `(0, 0)` — the universal "does not exist" signal that
/// callers distinguish from "just expired" (which also returns ttl `0`, but
/// with a nonzero age).
///
/// The interval's position (`number`) is folded into the age before
/// comparing against `interval.lifetime()`, so a snapshot's effective age is
/// relative to where it sits within the interval: `hourly.3` is expected to
/// be roughly three lifetimes old by the time it would be rotated out.
pub fn snapshot_ttl(
    snapshot: &Snapshot,
    interval: &Interval,
    fs: &impl Filesystem,
    now: SystemTime,
) -> (i64, i64) {
    let path = snapshot.relative_path();
    let Some(born) = fs.mtime(&path) else {
        return (0, 0);
    };

    let age = system_time_diff_secs(now, born);
    let mut relative_age = age;
    for _ in 1..snapshot.number() {
        relative_age -= interval.lifetime();
    }

    if relative_age < interval.lifetime() {
        (interval.lifetime() - relative_age, age)
    } else {
        (0, age)
    }
}

fn system_time_diff_secs(later: SystemTime, earlier: SystemTime) -> i64 {
    match later.duration_since(earlier) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

/// Build a `SystemTime` that many seconds after the Unix epoch, for tests
/// that want a synthetic, human-readable clock.
pub fn at_epoch_secs(secs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + std::time::Duration::from_secs(secs as u64)
    } else {
        UNIX_EPOCH - std::time::Duration::from_secs((-secs) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::fake::FakeFilesystem;

    #[test]
    fn nonexistent_snapshot_has_zero_ttl_and_age() {
        let fs = FakeFilesystem::new();
        let s = Snapshot::new("hourly", 1).unwrap();
        let iv = Interval::new("hourly", 4, 3600).unwrap();
        let (ttl, age) = snapshot_ttl(&s, &iv, &fs, at_epoch_secs(1000));
        assert_eq!((ttl, age), (0, 0));
    }

    #[test]
    fn fresh_snapshot_has_full_ttl() {
        let fs = FakeFilesystem::new();
        let s = Snapshot::new("hourly", 1).unwrap();
        fs.create(s.relative_path(), at_epoch_secs(1000));
        let iv = Interval::new("hourly", 4, 3600).unwrap();
        let (ttl, age) = snapshot_ttl(&s, &iv, &fs, at_epoch_secs(1000));
        assert_eq!(ttl, 3600);
        assert_eq!(age, 0);
    }

    #[test]
    fn expired_snapshot_has_zero_ttl_but_nonzero_age() {
        let fs = FakeFilesystem::new();
        let s = Snapshot::new("hourly", 1).unwrap();
        fs.create(s.relative_path(), at_epoch_secs(0));
        let iv = Interval::new("hourly", 4, 3600).unwrap();
        let (ttl, age) = snapshot_ttl(&s, &iv, &fs, at_epoch_secs(4000));
        assert_eq!(ttl, 0);
        assert_eq!(age, 4000);
    }

    #[test]
    fn later_position_ages_faster() {
        let fs = FakeFilesystem::new();
        let s = Snapshot::new("hourly", 3).unwrap();
        fs.create(s.relative_path(), at_epoch_secs(0));
        let iv = Interval::new("hourly", 4, 3600).unwrap();
        // age 3600 at position 3 means relative_age = 3600 - 2*3600 = -3600
        let (ttl, age) = snapshot_ttl(&s, &iv, &fs, at_epoch_secs(3600));
        assert_eq!(age, 3600);
        assert_eq!(ttl, 3600 - (-3600));
    }
}
