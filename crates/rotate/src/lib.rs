#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `rotate` implements the rotation and retention algorithm: deciding
//! whether a newly synced snapshot should move into the first interval slot,
//! cascading older snapshots up through the interval list, and queueing
//! anything that falls off the end for deletion.
//!
//! # Design
//!
//! The engine is generic over [`RotationFs`], a small trait covering the
//! handful of directory operations the algorithm needs (rename, recursive
//! remove, and "highest existing numbered slot in this interval"). Real
//! callers (the rotator child in `coordinator`) implement it over a chrooted
//! working directory; [`fake::FakeRotationFs`] backs the unit tests with an
//! in-memory tree and a synthetic clock.
//!
//! The two entry points are [`move_in`], which makes room for and installs a
//! newly synced snapshot into the first (shortest-lived) interval, and
//! [`spread_out`], which walks every interval afterward pushing anything
//! beyond its retention count into the next interval or into the deletion
//! area.
//!
//! # Invariants
//!
//! - After [`spread_out`] returns, no interval has more numbered slots on
//!   disk than its configured count, other than the single extra slot
//!   [`move_in`] may still be cascading into the next interval.
//! - Deletion never happens synchronously: anything queued is renamed into
//!   the deletion area ([`queue_delete`]) and only physically removed by
//!   [`purge_deleted`], which the caller runs once after rotation settles —
//!   mirroring the original design's goal of keeping a lock held for as
//!   short a time as possible.
//! - Running [`move_in`] and [`spread_out`] twice in a row with no
//!   intervening sync is idempotent: the second call finds nothing expired
//!   and nothing out of place, and changes nothing on disk.
//!
//! # Errors
//!
//! This crate's own functions do not fail except through [`RotationFs`]
//! returning an inconsistent state (handled internally); filesystem errors
//! are the implementing type's concern, not this crate's — the trait
//! methods are infallible by design so the algorithm can be exercised
//! without threading `Result` through every step. Real implementations
//! should panic or log-and-skip on unexpected OS errors rather than trying
//! to recover mid-rotation, matching the original tool's fail-fast posture.
//!
//! # Examples
//!
//! ```
//! use rotate::fake::FakeRotationFs;
//! use rotate::{move_in, spread_out};
//! use snapmodel::Interval;
//! use std::path::Path;
//!
//! let fs = FakeRotationFs::new();
//! let intervals = vec![
//!     Interval::new("hourly", 2, 3600).unwrap(),
//!     Interval::new("daily", 2, 86_400).unwrap(),
//! ];
//!
//! // A freshly synced snapshot starts life in the sync area and is moved in.
//! fs.create_sync_dir(0);
//! move_in(&fs, &intervals, &intervals[0], Path::new(".sync.1"), 0, false);
//! assert!(fs.exists_numbered("hourly", 1));
//! spread_out(&fs, &intervals, 0);
//! ```

pub mod fake;
mod fs;
mod rotation;

pub use fs::{purge_deleted, queue_delete, RotationFs, DEL_AREA, SYNC_AREA};
pub use rotation::{move_in, spread_out};

/// Seconds of slack subtracted from a snapshot's remaining TTL before it is
/// considered due for rotation, so a slightly-early cron tick does not
/// perpetually skip a snapshot that is due "any second now".
pub const TIMEPAD: i64 = 30;
