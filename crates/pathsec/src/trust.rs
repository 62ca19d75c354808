//! Ownership and permission trust verification for a path's ancestry.

use crate::normalize::normalize_path;
use crate::{PathSecError, Result};
use std::fs::Metadata;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

/// `relax` bits accepted by [`trusted_path`] for the final path component:
/// group/other read and execute.
pub mod relax {
    /// Group read.
    pub const GROUP_READ: u32 = 0o040;
    /// Group execute.
    pub const GROUP_EXEC: u32 = 0o010;
    /// Other read.
    pub const OTHER_READ: u32 = 0o004;
    /// Other execute.
    pub const OTHER_EXEC: u32 = 0o001;
}

const GROUP_OTHER_WRITE: u32 = 0o022;
const SYMLOOP_MAX: u32 = 32;

/// The outcome of a [`trusted_path`] check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trust {
    /// Whether the path (or all its existing ancestors) can be trusted.
    pub trusted: bool,
    /// Whether the full path exists in the filesystem. Only meaningful when
    /// `trusted` is `true`.
    pub exists: bool,
}

/// Walk `path` component by component from the filesystem root and verify
/// that every existing ancestor is owned by the superuser (uid 0) and has no
/// group- or other-writable bit set.
///
/// The final component, if it exists, is held to a stricter check: its
/// permission bits beyond the owner bits must be a subset of `relax_mask`
/// (built from the bits in [`relax`]), and if `gid` is `Some`, it must be
/// owned by that group.
///
/// Non-existent ancestors are not an error: a path can be "trusted" even
/// though nothing has been created yet, so callers can use this to validate
/// a directory they are about to create.
pub fn trusted_path(path: &Path, relax_mask: u32, gid: Option<u32>) -> Result<Trust> {
    if path.as_os_str().is_empty() {
        return Err(PathSecError::EmptyPath);
    }

    let root_meta = std::fs::symlink_metadata("/").map_err(|source| PathSecError::Io {
        context: "lstat /",
        source,
    })?;
    if root_meta.uid() != 0 || (root_meta.mode() & GROUP_OTHER_WRITE) != 0 {
        return Ok(Trust {
            trusted: false,
            exists: false,
        });
    }

    let mut current = normalize_path(path, false)?;
    let mut symlinks = 0u32;
    let mut exists = true;
    let mut final_meta: Option<Metadata> = None;

    let components: Vec<PathBuf> = ancestors_from_root(&current);
    let mut iter = components.into_iter().peekable();

    // Walk the path from the root down, re-resolving on every symlink hop,
    // exactly as the C implementation's single forward scan does.
    let mut walked = PathBuf::from("/");
    while let Some(next) = iter.next() {
        walked = next;
        match std::fs::symlink_metadata(&walked) {
            Ok(meta) => {
                if meta.uid() != 0 || (meta.mode() & GROUP_OTHER_WRITE) != 0 {
                    return Ok(Trust {
                        trusted: false,
                        exists: false,
                    });
                }
                if meta.file_type().is_symlink() {
                    symlinks += 1;
                    if symlinks > SYMLOOP_MAX {
                        return Err(PathSecError::SymlinkLoop(walked));
                    }
                    let target = std::fs::read_link(&walked).map_err(|source| PathSecError::Io {
                        context: "readlink",
                        source,
                    })?;
                    let remainder: PathBuf = iter.collect();
                    let resolved_target = if target.is_absolute() {
                        target
                    } else {
                        walked.parent().unwrap_or(Path::new("/")).join(target)
                    };
                    current = resolved_target.join(remainder);
                    let rebuilt = ancestors_from_root(&current);
                    iter = rebuilt.into_iter().peekable();
                    continue;
                }
                if iter.peek().is_none() {
                    final_meta = Some(meta);
                }
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                exists = false;
                final_meta = None;
                break;
            }
            Err(source) => {
                return Err(PathSecError::Io {
                    context: "lstat",
                    source,
                });
            }
        }
    }

    if let Some(meta) = final_meta {
        let mode = meta.mode() & 0o7077; // suid/sgid/sticky + group/other rwx
        if (mode & !relax_mask) != 0 {
            return Ok(Trust {
                trusted: false,
                exists: false,
            });
        }
        if let Some(gid) = gid {
            if meta.gid() != gid {
                return Ok(Trust {
                    trusted: false,
                    exists: false,
                });
            }
        }
    }

    Ok(Trust {
        trusted: true,
        exists,
    })
}

fn ancestors_from_root(path: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut acc = PathBuf::from("/");
    out.push(acc.clone());
    for component in path.components() {
        if let std::path::Component::Normal(part) = component {
            acc.push(part);
            out.push(acc.clone());
        }
    }
    out
}

/// Check whether `mode` requests only permission bits (no type bits) and
/// does not request group- or other-write access.
pub fn is_safe_dir_mode(mode: u32) -> bool {
    const PERM_BITS: u32 = 0o7777;
    (mode & !PERM_BITS) == 0 && (mode & 0o022) == 0
}

/// True if `metadata` describes a regular directory (not a symlink-resolved
/// stand-in, socket, fifo, or device).
pub fn is_plain_dir(metadata: &Metadata) -> bool {
    metadata.is_dir() && !metadata.file_type().is_symlink() && !metadata.file_type().is_socket()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn safe_mode_rejects_group_write() {
        assert!(!is_safe_dir_mode(0o775));
        assert!(is_safe_dir_mode(0o755));
    }

    #[test]
    fn trusts_a_root_owned_tmp_subdir() {
        let dir = tempfile::tempdir().unwrap();
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();
        let trust = trusted_path(dir.path(), relax::GROUP_READ | relax::GROUP_EXEC, None);
        // whether this trusts depends on who owns /tmp in the sandbox; the
        // call must at least succeed without error.
        assert!(trust.is_ok());
    }
}
