//! Directory operations the rotation algorithm needs beyond plain TTL
//! lookups.

use snapmodel::Filesystem;
use std::path::{Path, PathBuf};

/// Directory name prefix of the deletion holding pen: `.del.1`, `.del.2`, ...
pub const DEL_AREA: &str = ".del";

/// Directory name of the sync area the syncer writes a fresh snapshot into
/// before the rotator moves it in: `.sync.1`.
pub const SYNC_AREA: &str = ".sync";

/// The directory operations [`crate::move_in`] and [`crate::spread_out`]
/// need, on top of the TTL lookups [`snapmodel::Filesystem`] already
/// provides.
pub trait RotationFs: Filesystem {
    /// Atomically rename `from` to `to` (both relative to the endpoint
    /// root). Implementations may assume `from` exists.
    fn rename(&self, from: &Path, to: &Path);

    /// Recursively remove the directory at `path` and everything under it.
    fn remove_tree(&self, path: &Path);

    /// Return the highest `n` such that `<interval_name>.<n>` exists on
    /// disk, or `0` if none do. Mirrors the original's `maxbackup`: slots
    /// are expected to be contiguous from `1`, so this stops at the first
    /// gap.
    fn max_numbered(&self, interval_name: &str) -> u32;
}

/// Move the directory at `src` into the next free slot of the deletion area
/// and return the path it was moved to.
///
/// Mirrors the original's `qdel`: rotation never deletes synchronously, it
/// only ever renames into `.del.<n>`; a caller runs [`purge_deleted`]
/// afterward to reclaim the space.
pub fn queue_delete(fs: &impl RotationFs, src: &Path) -> PathBuf {
    let n = fs.max_numbered(DEL_AREA);
    let dst = PathBuf::from(format!("{DEL_AREA}.{}", n + 1));
    tracing::debug!(src = %src.display(), dst = %dst.display(), "queueing snapshot for deletion");
    fs.rename(src, &dst);
    dst
}

/// Physically remove everything queued in the deletion area.
///
/// Callers run this once after a rotation pass completes, so any lock held
/// for the rotation itself is released before the (potentially slow)
/// recursive removal begins.
pub fn purge_deleted(fs: &impl RotationFs) {
    let mut n = fs.max_numbered(DEL_AREA);
    while n > 0 {
        let path = PathBuf::from(format!("{DEL_AREA}.{n}"));
        tracing::debug!(path = %path.display(), "purging queued deletion");
        fs.remove_tree(&path);
        n -= 1;
    }
}
