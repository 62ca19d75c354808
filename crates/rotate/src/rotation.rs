//! The move-in / spread-out cascade.

use crate::fs::{queue_delete, RotationFs};
use crate::TIMEPAD;
use snapmodel::{snapshot_ttl, Interval, Snapshot};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

fn ttl_age(fs: &impl RotationFs, interval: &Interval, number: u32, now: SystemTime) -> (i64, i64) {
    let Ok(snapshot) = Snapshot::new(interval.name(), number) else {
        return (0, 0);
    };
    snapshot_ttl(&snapshot, interval, fs, now)
}

fn numbered_path(interval_name: &str, number: u32) -> PathBuf {
    PathBuf::from(format!("{interval_name}.{number}"))
}

fn now_from_epoch_secs(secs: i64) -> SystemTime {
    if secs >= 0 {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs as u64)
    } else {
        SystemTime::UNIX_EPOCH - Duration::from_secs((-secs) as u64)
    }
}

/// Move the snapshot directory at `src` into the interval `dest`, cascading
/// any existing, still-live snapshots in `dest` up by one slot first.
///
/// `dest` must be one member of `intervals` (matched by name); `now_secs` is
/// the current time expressed as seconds since the Unix epoch, and `force`
/// mirrors the original tool's `-f` flag: when set, an occupied first slot
/// in `dest` is evicted unconditionally rather than only when expired.
///
/// If, after cascading, the first slot of `dest` is still occupied and
/// `force` is false, `src` itself is discarded (queued for deletion) rather
/// than installed — this is how an endpoint with, say, only `hourly`
/// configured silently drops a sync that arrives before the previous
/// snapshot has expired.
pub fn move_in(
    fs: &impl RotationFs,
    intervals: &[Interval],
    dest: &Interval,
    src: &Path,
    now_secs: i64,
    force: bool,
) {
    let now = now_from_epoch_secs(now_secs);

    // Find the oldest non-expired (or first nonexistent) slot in `dest`.
    let mut i: u32 = 1;
    let (mut ttl, mut age) = loop {
        let (ttl, age) = ttl_age(fs, dest, i, now);
        if ttl == 0 && age == 0 {
            break (ttl, age); // slot does not exist
        }
        if (ttl - TIMEPAD) > 0 {
            break (ttl, age); // slot not yet expired
        }
        i += 1;
    };

    tracing::debug!(
        interval = dest.name(),
        position = i,
        ttl,
        age,
        "oldest non-expired slot found"
    );

    // Point i at the oldest *expired* slot, or 0 if none.
    i -= 1;

    if (ttl != 0 || age != 0) && i > 0 {
        let oldest_expired = numbered_path(dest.name(), i);
        queue_delete(fs, &oldest_expired);
        i -= 1;
    }

    while i > 0 {
        let from = numbered_path(dest.name(), i);
        let to = numbered_path(dest.name(), i + 1);
        fs.rename(&from, &to);
        i -= 1;
    }

    let (first_ttl, first_age) = ttl_age(fs, dest, 1, now);
    ttl = first_ttl;
    age = first_age;

    let first_slot = numbered_path(dest.name(), 1);

    if (ttl != 0 || age != 0) && force {
        queue_delete(fs, &first_slot);
        ttl = 0;
        age = 0;
    }

    if ttl != 0 || age != 0 {
        queue_delete(fs, src);
    } else {
        tracing::debug!(from = %src.display(), to = %first_slot.display(), "moving in");
        fs.rename(src, &first_slot);
        // Touch the new slot's mtime so its age is measured from "now",
        // not from whenever the sync area directory happened to be
        // created.
        fs.set_mtime(&first_slot, now);
    }

    let _ = intervals; // kept for API symmetry with `spread_out`'s signature
}

/// For each interval in ascending-lifetime order, delete any numbered slots
/// beyond its retention count except the single newest overflow slot, which
/// is cascaded into the next interval (via [`move_in`], unforced) or, if
/// there is no next interval, queued for deletion.
pub fn spread_out(fs: &impl RotationFs, intervals: &[Interval], now_secs: i64) {
    for (idx, interval) in intervals.iter().enumerate() {
        let mut n = fs.max_numbered(interval.name());

        while n > 1 && n - 1 > interval.count() {
            let doomed = numbered_path(interval.name(), n);
            queue_delete(fs, &doomed);
            n -= 1;
        }

        if n > interval.count() {
            match intervals.get(idx + 1) {
                None => {
                    let doomed = numbered_path(interval.name(), n);
                    queue_delete(fs, &doomed);
                }
                Some(next) => {
                    let overflow = numbered_path(interval.name(), n);
                    move_in(fs, intervals, next, &overflow, now_secs, false);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeRotationFs;

    fn intervals() -> Vec<Interval> {
        vec![
            Interval::new("hourly", 2, 3600).unwrap(),
            Interval::new("daily", 2, 86_400).unwrap(),
        ]
    }

    #[test]
    fn move_in_installs_into_empty_first_slot() {
        let fs = FakeRotationFs::new();
        fs.create_sync_dir(0);
        let ivs = intervals();
        move_in(&fs, &ivs, &ivs[0], &PathBuf::from(".sync.1"), 0, false);
        assert!(fs.exists_numbered("hourly", 1));
        assert!(!fs.exists(&PathBuf::from(".sync.1")));
    }

    #[test]
    fn move_in_cascades_existing_slots_up() {
        let fs = FakeRotationFs::new();
        fs.create_numbered("hourly", 1, 0);
        fs.create_sync_dir(3600);
        let ivs = intervals();
        // hourly.1 is still fresh at t=3600 (age 3600, ttl 0 after timepad? lifetime 3600 so ttl=0)
        move_in(&fs, &ivs, &ivs[0], &PathBuf::from(".sync.1"), 3600, false);
        assert!(fs.exists_numbered("hourly", 2));
        assert!(fs.exists_numbered("hourly", 1));
    }

    #[test]
    fn move_in_drops_sync_when_slot_occupied_and_not_forced() {
        let fs = FakeRotationFs::new();
        fs.create_numbered("hourly", 1, 0);
        fs.create_numbered("hourly", 2, 0);
        fs.create_sync_dir(10);
        let ivs = intervals();
        // both hourly.1 and hourly.2 are fresh (age 10) so nothing cascades
        // and position 1 stays occupied: the new sync is discarded.
        move_in(&fs, &ivs, &ivs[0], &PathBuf::from(".sync.1"), 10, false);
        assert!(!fs.exists(&PathBuf::from(".sync.1")));
        assert_eq!(fs.max_numbered("hourly"), 2);
    }

    #[test]
    fn spread_out_pushes_overflow_into_next_interval() {
        let fs = FakeRotationFs::new();
        fs.create_numbered("hourly", 1, 0);
        fs.create_numbered("hourly", 2, 0);
        fs.create_numbered("hourly", 3, 0);
        let ivs = intervals();
        spread_out(&fs, &ivs, 0);
        assert_eq!(fs.max_numbered("hourly"), 2);
        assert!(fs.exists_numbered("daily", 1));
    }

    #[test]
    fn spread_out_is_idempotent() {
        let fs = FakeRotationFs::new();
        fs.create_numbered("hourly", 1, 0);
        fs.create_numbered("hourly", 2, 0);
        let ivs = intervals();
        spread_out(&fs, &ivs, 0);
        let before = fs.max_numbered("hourly");
        spread_out(&fs, &ivs, 0);
        assert_eq!(before, fs.max_numbered("hourly"));
    }
}
