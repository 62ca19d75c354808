//! Idempotent, trust-preserving directory creation.

use crate::normalize::normalize_path;
use crate::trust::{is_safe_dir_mode, trusted_path};
use crate::{PathSecError, Result};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

/// Outcome of [`secure_ensure_dir`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnsureDirReport {
    /// Number of directory levels created that did not previously exist.
    pub created: u32,
    /// Whether the final directory's mode or group ownership was changed to
    /// match the request.
    pub updated: bool,
}

/// Ensure `path` exists as a directory with exactly `mode` permission bits
/// and, if `gid` is `Some`, that group ownership.
///
/// Every already-existing ancestor of `path` must first pass
/// [`trusted_path`] (superuser-owned, no group/other write bit) or this
/// returns [`PathSecError::UnsafeMode`]/[`PathSecError::Io`] with
/// `ErrorKind::PermissionDenied` without creating anything. Missing
/// ancestors are created with `mode`. This makes repeated calls with the
/// same arguments idempotent: the second call creates nothing and reports
/// `created: 0`.
pub fn secure_ensure_dir(path: &Path, mode: u32, gid: Option<u32>) -> Result<EnsureDirReport> {
    if !is_safe_dir_mode(mode) {
        return Err(PathSecError::UnsafeMode(mode));
    }

    let trust = trusted_path(
        path,
        crate::trust::relax::GROUP_READ
            | crate::trust::relax::GROUP_EXEC
            | crate::trust::relax::OTHER_READ
            | crate::trust::relax::OTHER_EXEC,
        None,
    )?;
    if !trust.trusted {
        return Err(PathSecError::Io {
            context: "secure_ensure_dir: untrusted path",
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });
    }

    let absolute = normalize_path(path, false)?;
    let mut created = 0u32;
    let mut acc = PathBuf::from("/");
    for component in absolute.components() {
        if let std::path::Component::Normal(part) = component {
            acc.push(part);
            match std::fs::symlink_metadata(&acc) {
                Ok(meta) => {
                    if !meta.is_dir() {
                        return Err(PathSecError::Io {
                            context: "secure_ensure_dir: not a directory",
                            source: std::io::Error::from(std::io::ErrorKind::AlreadyExists),
                        });
                    }
                }
                Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                    std::fs::create_dir(&acc).map_err(|source| PathSecError::Io {
                        context: "mkdir",
                        source,
                    })?;
                    std::fs::set_permissions(&acc, std::fs::Permissions::from_mode(mode))
                        .map_err(|source| PathSecError::Io {
                            context: "chmod on create",
                            source,
                        })?;
                    created += 1;
                }
                Err(source) => {
                    return Err(PathSecError::Io {
                        context: "stat",
                        source,
                    })
                }
            }
        }
    }

    let meta = std::fs::symlink_metadata(&absolute).map_err(|source| PathSecError::Io {
        context: "stat final",
        source,
    })?;
    let mut updated = false;

    let current_mode = meta.mode() & 0o7777;
    if current_mode != mode {
        std::fs::set_permissions(&absolute, std::fs::Permissions::from_mode(mode)).map_err(
            |source| PathSecError::Io {
                context: "chmod reconcile",
                source,
            },
        )?;
        updated = true;
    }

    if let Some(gid) = gid {
        if meta.gid() != gid {
            chown_group(&absolute, gid)?;
            updated = true;
        }
    }

    Ok(EnsureDirReport { created, updated })
}

fn chown_group(path: &Path, gid: u32) -> Result<()> {
    let c_path = std::ffi::CString::new(path.as_os_str().as_encoded_bytes())
        .map_err(|_| PathSecError::InvalidComponent(path.display().to_string()))?;
    // SAFETY: `c_path` is a valid, NUL-terminated string for the duration of
    // the call; `chown` with uid -1 leaves the owner unchanged.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::chown(c_path.as_ptr(), u32::MAX, gid) };
    if rc != 0 {
        return Err(PathSecError::Io {
            context: "chown",
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_reconcile_is_idempotent() {
        let base = tempfile::tempdir().unwrap();
        std::fs::set_permissions(base.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
        let target = base.path().join("a").join("b");

        let first = secure_ensure_dir(&target, 0o750, None).unwrap();
        assert_eq!(first.created, 2);

        let second = secure_ensure_dir(&target, 0o750, None).unwrap();
        assert_eq!(second.created, 0);
        assert!(!second.updated);
    }

    #[test]
    fn rejects_group_write_mode() {
        let base = tempfile::tempdir().unwrap();
        let target = base.path().join("x");
        let err = secure_ensure_dir(&target, 0o770, None).unwrap_err();
        assert!(matches!(err, PathSecError::UnsafeMode(_)));
    }
}
