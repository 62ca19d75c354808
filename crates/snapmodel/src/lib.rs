#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `snapmodel` holds the data model shared by the rotation engine and the
//! configuration loader: intervals, snapshot references, endpoints, and the
//! TTL arithmetic that decides whether a given snapshot slot has expired.
//!
//! # Design
//!
//! [`Interval`] is a named retention tier (`hourly`, `daily`, ...) with a
//! `count` and a `lifetime`. [`Snapshot`] identifies one numbered slot within
//! an interval (`<interval>.<n>`) without itself touching the filesystem.
//! [`Endpoint`] bundles the ordered interval list with everything needed to
//! address a remote host and a local root.
//!
//! Filesystem access (reading a snapshot's modification time) is abstracted
//! behind the [`Filesystem`] trait so the TTL and rotation arithmetic can be
//! exercised against an in-memory fake with a synthetic clock, exactly as the
//! concrete rotation scenarios require.
//!
//! # Invariants
//!
//! - Interval lists are ordered by ascending lifetime; [`Endpoint::new`]
//!   enforces this so every consumer can rely on "next interval" meaning
//!   "longer lifetime".
//! - [`snapshot_ttl`] never reports a negative number of seconds remaining;
//!   zero means expired (or nonexistent).
//!
//! # Errors
//!
//! [`ModelError`] reports invalid interval configuration (zero lifetime,
//! unordered intervals, zero count everywhere) and invalid snapshot numbers.
//!
//! # Examples
//!
//! ```
//! use snapmodel::Interval;
//!
//! let hourly = Interval::new("hourly", 4, 3600).unwrap();
//! assert_eq!(hourly.count(), 4);
//! ```

mod endpoint;
mod filesystem;
mod interval;
mod snapshot;

pub use endpoint::Endpoint;
pub use filesystem::{Filesystem, RealFilesystem};
pub use interval::Interval;
pub use snapshot::{snapshot_ttl, Snapshot};

/// Errors produced by the snapshot data model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// An interval was configured with a zero or negative lifetime.
    #[error("interval {0:?} has a non-positive lifetime")]
    NonPositiveLifetime(String),
    /// No interval in the endpoint retains more than zero snapshots.
    #[error("endpoint has no interval with a positive retention count")]
    NoRetention,
    /// Intervals were not supplied in ascending-lifetime order.
    #[error("interval {0:?} does not have a strictly greater lifetime than the previous interval")]
    UnorderedIntervals(String),
    /// A snapshot number outside `1..i32::MAX` was requested.
    #[error("snapshot number {0} is out of range")]
    InvalidNumber(i64),
}

type Result<T> = std::result::Result<T, ModelError>;
