#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `pathsec` implements the filesystem trust primitives snapcycle relies on
//! before it ever hands a directory to an unprivileged child: path
//! normalization, ownership/mode "trust" verification, and idempotent,
//! trust-preserving directory creation.
//!
//! # Design
//!
//! - [`normalize`] turns a possibly relative, possibly `.`/`..`-laden path
//!   into an absolute, slash-normalized one, and separately normalizes a
//!   single path component into something safe to use as a directory name.
//! - [`trust`] walks a path component by component from the filesystem root,
//!   verifying every existing ancestor is owned by the superuser and carries
//!   no group/other write bit, following symlinks up to a bounded depth.
//! - [`ensure_dir`] builds on [`trust`] to create (or reconcile the mode and
//!   group of) a directory tree, refusing to do so unless every already
//!   existing ancestor passes the trust check first.
//!
//! # Invariants
//!
//! - None of these functions ever treat an untrusted path as trusted: a
//!   failure to stat, a loop of symlinks, or a disallowed permission bit all
//!   resolve to "not trusted", never to an error that could be mistaken for
//!   "trusted".
//! - [`ensure_dir::secure_ensure_dir`] never relaxes permissions beyond what
//!   the caller asked for, and never grants group/other write access.
//!
//! # Errors
//!
//! [`PathSecError`] reports normalization failures (empty path, missing
//! `HOME`-independent current directory, component too long) and the I/O
//! failures that can occur while walking or creating a path.
//!
//! # Examples
//!
//! ```
//! use pathsec::normalize::normalize_path_component;
//!
//! let mut name = String::from("2024-01-01//12:00");
//! normalize_path_component(&mut name).unwrap();
//! assert_eq!(name, "2024-01-01_12:00");
//! ```

pub mod ensure_dir;
pub mod normalize;
pub mod trust;

pub use ensure_dir::secure_ensure_dir;
pub use normalize::{inroot, normalize_path, normalize_path_component};
pub use trust::trusted_path;

use std::path::PathBuf;

/// Errors produced by the path security primitives in this crate.
#[derive(Debug, thiserror::Error)]
pub enum PathSecError {
    /// The given path was empty.
    #[error("path is empty")]
    EmptyPath,
    /// A path component, once normalized, would be empty or exceed the
    /// platform's maximum file name length.
    #[error("path component {0:?} is invalid")]
    InvalidComponent(String),
    /// A symlink chain exceeded the bounded follow limit.
    #[error("too many levels of symbolic links resolving {0:?}")]
    SymlinkLoop(PathBuf),
    /// An underlying filesystem operation failed.
    #[error("{context}: {source}")]
    Io {
        /// What the caller was trying to do when the I/O call failed.
        context: &'static str,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// A requested directory mode included bits outside the allowed
    /// permission mask, or requested group/other write access.
    #[error("refusing to create a directory with mode {0:o}")]
    UnsafeMode(u32),
}

type Result<T> = std::result::Result<T, PathSecError>;
