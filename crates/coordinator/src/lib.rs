#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `coordinator` owns the privilege-separated process tree that actually
//! performs a backup: for each endpoint it forks a rotator, a syncer, and
//! (if configured) a postexec hook, then drives them through one
//! start/ready/decide handshake per run.
//!
//! # Design
//!
//! [`provisioning::provision`] verifies and, where allowed, creates an
//! endpoint's root and local working directories before anything is
//! forked. [`orchestrate::run_endpoint`] then forks the three children (see
//! [`children`]) and walks the same command sequence the original tool's
//! `main()` does: tell the rotator to start, and either let it report
//! `CMDCLOSED` (nothing to do, everyone stops) or `CMDREADY` (a fresh sync
//! area exists, so start the syncer, optionally hand its exit status to
//! postexec, and tell the rotator whether to keep or discard the result).
//!
//! [`fs::RealRotationFs`] adapts `rotate`'s filesystem trait to real
//! `std::fs` calls relative to the rotator's chrooted working directory.
//! [`privilege::privdrop`] and [`lock::RotationLock`] cover the two
//! privileged primitives ([`rsync_args`] covers none — it is pure argument
//! construction, kept separate so it can be unit tested without forking
//! anything).
//!
//! # Invariants
//!
//! - No child process is ever handed a uid or gid of 0: [`privilege::privdrop`]
//!   refuses outright, and the syncer checks again before chdir-ing.
//! - The rotator's `.lock` file is only ever held for the duration of one
//!   rotation decision; a contended lock is treated as "someone else is
//!   already rotating this endpoint", not an error.
//!
//! # Errors
//!
//! [`orchestrate::OrchestrateError`] wraps provisioning, process, and IPC
//! failures for one endpoint; [`orchestrate::run_all`] logs each endpoint's
//! failure and keeps going rather than aborting the whole run.
//!
//! # See also
//!
//! - `config`, which resolves the settings this crate provisions and forks
//!   against.
//! - `rotate`, which implements the move-in/spread-out algorithm the
//!   rotator child calls into.

pub mod children;
pub mod endpoint_path;
pub mod fs;
pub mod lock;
pub mod orchestrate;
pub mod privilege;
pub mod process;
pub mod provisioning;
pub mod rsync_args;

pub use orchestrate::{run_all, run_endpoint, OrchestrateError, RunOptions};
