//! An endpoint: one remote host/path pair backed up into one local root.

use crate::filesystem::Filesystem;
use crate::interval::Interval;
use crate::snapshot::{snapshot_ttl, Snapshot};
use crate::{ModelError, Result};
use std::time::SystemTime;

/// Everything needed to identify and back up one remote source into one
/// local snapshot root.
#[derive(Debug, Clone)]
pub struct Endpoint {
    root: std::path::PathBuf,
    ruser: String,
    hostname: String,
    rpath: String,
    uid: u32,
    gid: u32,
    intervals: Vec<Interval>,
    rsync_bin: Option<String>,
    rsync_args: Vec<String>,
    rsync_accept_exit_codes: Vec<i32>,
    postexec: Option<String>,
}

impl Endpoint {
    /// Build an endpoint, validating that `intervals` is non-empty, sorted
    /// by strictly ascending lifetime, and that at least one interval
    /// retains more than zero snapshots.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        root: impl Into<std::path::PathBuf>,
        ruser: impl Into<String>,
        hostname: impl Into<String>,
        rpath: impl Into<String>,
        uid: u32,
        gid: u32,
        intervals: Vec<Interval>,
    ) -> Result<Self> {
        if intervals.is_empty() {
            return Err(ModelError::NoRetention);
        }
        if !intervals.iter().any(|iv| iv.count() > 0) {
            return Err(ModelError::NoRetention);
        }
        for pair in intervals.windows(2) {
            if pair[1].lifetime() <= pair[0].lifetime() {
                return Err(ModelError::UnorderedIntervals(pair[1].name().to_string()));
            }
        }

        Ok(Self {
            root: root.into(),
            ruser: ruser.into(),
            hostname: hostname.into(),
            rpath: rpath.into(),
            uid,
            gid,
            intervals,
            rsync_bin: None,
            rsync_args: Vec::new(),
            rsync_accept_exit_codes: Vec::new(),
            postexec: None,
        })
    }

    /// The local snapshot root directory.
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// The remote user used for the rsync transfer.
    pub fn ruser(&self) -> &str {
        &self.ruser
    }

    /// The remote hostname or address.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The remote source path.
    pub fn rpath(&self) -> &str {
        &self.rpath
    }

    /// The local uid the syncer drops privileges to.
    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// The local gid the syncer drops privileges to.
    pub fn gid(&self) -> u32 {
        self.gid
    }

    /// The endpoint's retention intervals, ordered by ascending lifetime.
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// An informal identifier for log lines: `hostname:rpath`.
    pub fn id(&self) -> String {
        format!("{}:{}", self.hostname, self.rpath)
    }

    /// Override the rsync binary path (defaults to `rsync` on `$PATH`).
    pub fn set_rsync_bin(&mut self, bin: Option<String>) {
        self.rsync_bin = bin;
    }

    /// The configured rsync binary path, if any.
    pub fn rsync_bin(&self) -> Option<&str> {
        self.rsync_bin.as_deref()
    }

    /// Additional user-supplied rsync arguments, appended after the fixed
    /// ones snapcycle always passes.
    pub fn set_rsync_args(&mut self, args: Vec<String>) {
        self.rsync_args = args;
    }

    /// Additional user-supplied rsync arguments.
    pub fn rsync_args(&self) -> &[String] {
        &self.rsync_args
    }

    /// Exit codes from the syncer that should still be treated as a
    /// successful sync (in addition to `0`), when no `postexec` hook is
    /// configured to make that decision instead.
    pub fn set_rsync_accept_exit_codes(&mut self, codes: Vec<i32>) {
        self.rsync_accept_exit_codes = codes;
    }

    /// Exit codes accepted as success.
    pub fn rsync_accept_exit_codes(&self) -> &[i32] {
        &self.rsync_accept_exit_codes
    }

    /// An optional hook executed after the syncer exits, whose own exit
    /// status decides whether to keep or discard the new snapshot.
    pub fn set_postexec(&mut self, postexec: Option<String>) {
        self.postexec = postexec;
    }

    /// The configured postexec hook path, if any.
    pub fn postexec(&self) -> Option<&str> {
        self.postexec.as_deref()
    }

    /// Find the interval named `name`, if configured.
    pub fn interval(&self, name: &str) -> Option<&Interval> {
        self.intervals.iter().find(|iv| iv.name() == name)
    }
}

/// Find the newest snapshot that exists on disk across all of an endpoint's
/// intervals, searching from the shortest-lived interval to the longest.
///
/// Within an interval, positions are checked from `1` upward (the most
/// recently rotated-in slot first); the first one found to exist (ttl
/// nonzero, or age nonzero meaning "expired but present") is returned.
pub fn newest_snapshot(
    endpoint: &Endpoint,
    fs: &impl Filesystem,
    now: SystemTime,
) -> Option<Snapshot> {
    for interval in &endpoint.intervals {
        for number in 1..=interval.count().max(1) {
            let Ok(candidate) = Snapshot::new(interval.name(), number) else {
                continue;
            };
            let (ttl, age) = snapshot_ttl(&candidate, interval, fs, now);
            if ttl != 0 || age != 0 {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::fake::FakeFilesystem;
    use crate::snapshot::at_epoch_secs;

    fn endpoint() -> Endpoint {
        Endpoint::new(
            "/srv/backup/host",
            "backup",
            "host.example",
            "/data",
            100,
            100,
            vec![
                Interval::new("hourly", 4, 3600).unwrap(),
                Interval::new("daily", 7, 86_400).unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn rejects_unordered_intervals() {
        let err = Endpoint::new(
            "/srv/x",
            "u",
            "h",
            "/d",
            100,
            100,
            vec![
                Interval::new("daily", 7, 86_400).unwrap(),
                Interval::new("hourly", 4, 3600).unwrap(),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::UnorderedIntervals(_)));
    }

    #[test]
    fn rejects_all_zero_counts() {
        let err = Endpoint::new(
            "/srv/x",
            "u",
            "h",
            "/d",
            100,
            100,
            vec![Interval::new("hourly", 0, 3600).unwrap()],
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::NoRetention));
    }

    #[test]
    fn newest_snapshot_finds_most_recent_existing() {
        let ep = endpoint();
        let fs = FakeFilesystem::new();
        fs.create("hourly.1", at_epoch_secs(1000));
        let found = newest_snapshot(&ep, &fs, at_epoch_secs(1000)).unwrap();
        assert_eq!(found.dir_name(), "hourly.1");
    }

    #[test]
    fn newest_snapshot_none_when_nothing_on_disk() {
        let ep = endpoint();
        let fs = FakeFilesystem::new();
        assert!(newest_snapshot(&ep, &fs, at_epoch_secs(1000)).is_none());
    }
}
