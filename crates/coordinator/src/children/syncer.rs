//! The syncer child: drops privileges, chdirs into the sync area the
//! rotator prepared, and execs rsync.

use crate::fs::RealRotationFs;
use crate::privilege::privdrop;
use crate::rsync_args::build_argv;
use ipc::channel::Channel;
use ipc::{read_command, Command};
use rotate::SYNC_AREA;
use snapmodel::{newest_snapshot, Endpoint};
use std::os::unix::process::CommandExt;
use std::path::Path;

/// Wait for the rotator-mediated start signal, then `exec` rsync. Never
/// returns on success; returns an exit code on any failure that happens
/// before the exec (the original's analog calls `err(1, ...)`, which this
/// mirrors by returning a nonzero status for the coordinator to report
/// instead of continuing as if rsync ran).
///
/// `local_path` is the endpoint's local working directory (what `rotator`
/// chroots into); the syncer itself is not chrooted; it instead passes
/// `local_path` to rsync's own `--chroot` flag, trusting the hardened rsync
/// build to enforce the jail during the actual transfer.
pub fn run(endpoint: &Endpoint, local_path: &Path, mut channel: Channel, verbosity: i32) -> i32 {
    let cmd = match read_command(&mut channel) {
        Ok(cmd) => cmd,
        Err(error) => {
            tracing::error!(%error, "syncer: reading start command failed");
            return 1;
        }
    };

    match cmd {
        Command::Stop | Command::Closed => return 0,
        Command::Start => {}
        other => {
            tracing::error!(?other, "syncer: unexpected command");
            return 1;
        }
    }

    if endpoint.uid() == 0 || endpoint.gid() == 0 {
        tracing::error!("syncer: refusing to run as the superuser");
        return 1;
    }

    if let Err(error) = std::env::set_current_dir(local_path) {
        tracing::error!(%error, path = %local_path.display(), "syncer: chdir into endpoint path failed");
        return 1;
    }

    // Find the most recent snapshot while still rooted at the endpoint
    // path, before chdir-ing further into the sync area itself.
    let fs = RealRotationFs;
    let link_dest = newest_snapshot(endpoint, &fs, std::time::SystemTime::now())
        .map(|s| format!("../{}", s.dir_name()));

    let sync_dir = format!("{SYNC_AREA}.1");
    if let Err(error) = std::env::set_current_dir(&sync_dir) {
        tracing::error!(%error, dir = %sync_dir, "syncer: chdir into sync area failed");
        return 1;
    }

    if let Err(error) = privdrop(endpoint.uid(), endpoint.gid()) {
        tracing::error!(%error, "syncer: dropping privileges failed");
        return 1;
    }

    let argv = build_argv(endpoint, local_path, ".", link_dest.as_deref(), verbosity);

    let rsync_bin = endpoint
        .rsync_bin()
        .unwrap_or(crate::rsync_args::DEFAULT_RSYNC_BIN);
    let error = std::process::Command::new(rsync_bin)
        .args(&argv[1..])
        .env_clear()
        .exec();
    tracing::error!(%error, bin = rsync_bin, "syncer: exec failed");
    1
}
