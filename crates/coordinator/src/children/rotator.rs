//! The rotator child: chroots into an endpoint's local path, prepares a
//! fresh sync area for the syncer, and on success moves it into the first
//! retention interval, cascading older snapshots and queueing overflow for
//! deletion.

use crate::fs::RealRotationFs;
use crate::lock::RotationLock;
use ipc::channel::Channel;
use ipc::{read_command, write_command, Command};
use rotate::{move_in, purge_deleted, queue_delete, spread_out, SYNC_AREA, TIMEPAD};
use snapmodel::{newest_snapshot, snapshot_ttl, Endpoint, Interval, Snapshot};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const SYNC_DIR_NUMBER: u32 = 1;

/// Mode granting the syncer access to the freshly prepared sync area.
const ALLOW_SYNCER_MODE: u32 = 0o755;
/// Mode revoking the syncer's access once rotation decides the outcome.
const BLOCK_SYNCER_MODE: u32 = 0o705;

fn sync_dir_path() -> PathBuf {
    PathBuf::from(format!("{SYNC_AREA}.{SYNC_DIR_NUMBER}"))
}

fn chmod(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(error) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)) {
        tracing::warn!(path = %path.display(), %error, "chmod failed");
    }
}

/// Whether the first slot of `interval` is still comfortably inside its
/// lifetime, i.e. there is no point starting a sync yet.
///
/// Mirrors the original's pre-lock short-circuit: `(ttl - TIMEPAD) > 0`
/// means "not due yet", skipped entirely when `force` is set.
fn first_slot_not_yet_due(interval: &Interval, now: SystemTime, force: bool) -> bool {
    if force {
        return false;
    }
    let fs = RealRotationFs;
    let Ok(first) = Snapshot::new(interval.name(), 1) else {
        return false;
    };
    let (ttl, _age) = snapshot_ttl(&first, interval, &fs, now);
    (ttl - TIMEPAD) > 0
}

/// The rotator child's single command cycle. Takes ownership of `channel`
/// (the coordinator's command channel) and the endpoint, having already
/// chrooted and changed directory into `local_path`. Processes one
/// Start→rotate-or-skip cycle and returns, matching the original's
/// single-pass `exit(0)`.
///
/// `force` mirrors `-f`: an unexpired first slot no longer blocks a new
/// sync from starting.
pub fn run(endpoint: &Endpoint, mut channel: Channel, force: bool) -> i32 {
    let cmd = match read_command(&mut channel) {
        Ok(cmd) => cmd,
        Err(error) => {
            tracing::error!(%error, "rotator: reading command failed");
            return 1;
        }
    };

    match cmd {
        Command::Stop | Command::Closed => return 0,
        Command::Start => {}
        other => {
            tracing::error!(?other, "rotator: unexpected command while idle");
            return 1;
        }
    }

    let now = SystemTime::now();
    let first_interval = &endpoint.intervals()[0];

    if first_slot_not_yet_due(first_interval, now, force) {
        if write_command(&mut channel, Command::Closed).is_err() {
            return 1;
        }
        return 0;
    }

    let Some(lock) = RotationLock::try_acquire(Path::new(".")).unwrap_or(None) else {
        tracing::warn!("rotator: endpoint already locked by another rotation pass");
        if write_command(&mut channel, Command::Closed).is_err() {
            return 1;
        }
        return 0;
    };

    let fs = RealRotationFs;
    let sync_dir = sync_dir_path();

    // An orphaned sync area from a previous, interrupted pass never
    // gets a second chance: queue it for deletion and start fresh.
    if std::fs::symlink_metadata(&sync_dir).is_ok() {
        queue_delete(&fs, &sync_dir);
    }

    if let Err(error) = std::fs::create_dir(&sync_dir) {
        tracing::error!(path = %sync_dir.display(), %error, "rotator: creating sync area failed");
        drop(lock);
        return 1;
    }
    chmod(&sync_dir, ALLOW_SYNCER_MODE);

    // The syncer's link-dest points at the newest snapshot on disk; grant it
    // read access for the duration of the sync so the hardlink optimization
    // does not fail with EACCES.
    let newest = newest_snapshot(endpoint, &fs, now);
    if let Some(newest) = &newest {
        chmod(Path::new(&newest.dir_name()), ALLOW_SYNCER_MODE);
    }

    if write_command(&mut channel, Command::Ready).is_err() {
        drop(lock);
        return 1;
    }

    let decision = match read_command(&mut channel) {
        Ok(cmd) => cmd,
        Err(error) => {
            tracing::error!(%error, "rotator: reading rotation decision failed");
            drop(lock);
            return 1;
        }
    };

    chmod(&sync_dir, BLOCK_SYNCER_MODE);
    if let Some(newest) = &newest {
        chmod(Path::new(&newest.dir_name()), BLOCK_SYNCER_MODE);
    }

    let now_secs = epoch_secs(now);
    match decision {
        Command::RotInclude => {
            move_in(
                &fs,
                endpoint.intervals(),
                first_interval,
                &sync_dir,
                now_secs,
                force,
            );
            spread_out(&fs, endpoint.intervals(), now_secs);
        }
        Command::RotCleanup => {
            queue_delete(&fs, &sync_dir);
        }
        other => {
            tracing::error!(?other, "rotator: unexpected rotation decision");
            drop(lock);
            return 1;
        }
    }

    purge_deleted(&fs);
    drop(lock);
    0
}

fn epoch_secs(t: SystemTime) -> i64 {
    match t.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapmodel::Interval;

    #[test]
    fn not_yet_due_unless_forced() {
        // No snapshot on disk yet (ttl/age both 0) is always "due".
        let iv = Interval::new("hourly", 4, 3600).unwrap();
        assert!(!first_slot_not_yet_due(&iv, SystemTime::now(), false));
        assert!(!first_slot_not_yet_due(&iv, SystemTime::now(), true));
    }

    #[test]
    fn sync_dir_is_dot_sync_dot_one() {
        assert_eq!(sync_dir_path(), PathBuf::from(".sync.1"));
    }
}
