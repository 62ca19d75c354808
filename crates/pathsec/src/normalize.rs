//! Path normalization: collapsing `.`/`..`, making paths absolute, and turning
//! a single arbitrary string into a safe path component.

use crate::{PathSecError, Result};
use std::path::{Path, PathBuf};

/// Maximum length, in bytes, of a single normalized path component.
///
/// Mirrors `NAME_MAX` on the platforms snapcycle targets.
pub const NAME_MAX: usize = 255;

/// Normalize `path` into an absolute path with no `.` or `..` components and
/// no repeated slashes, without touching the filesystem beyond reading the
/// current working directory for relative inputs.
///
/// A trailing slash is added when `with_slash` is `true` and omitted
/// otherwise, matching the two calling conventions used by the trust and
/// directory-creation primitives in this crate.
pub fn normalize_path(path: &Path, with_slash: bool) -> Result<PathBuf> {
    let path_str = path.as_os_str().to_string_lossy();
    if path_str.is_empty() {
        return Err(PathSecError::EmptyPath);
    }

    let mut resolved = if path.is_absolute() {
        PathBuf::from("/")
    } else {
        std::env::current_dir().map_err(|source| PathSecError::Io {
            context: "getcwd",
            source,
        })?
    };

    for component in path.components() {
        use std::path::Component;
        match component {
            Component::RootDir | Component::Prefix(_) => {}
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(part) => resolved.push(part),
        }
    }

    if resolved.as_os_str().is_empty() {
        resolved.push("/");
    }

    if with_slash {
        let mut s = resolved.into_os_string();
        if !s.to_string_lossy().ends_with('/') {
            s.push("/");
        }
        resolved = PathBuf::from(s);
    }

    Ok(resolved)
}

/// Normalize `name` into a single safe path component in place: collapse
/// repeated slashes into underscores, drop a trailing slash, and reject
/// names that are empty, too long, or exactly `.`/`..`.
pub fn normalize_path_component(name: &mut String) -> Result<()> {
    if name.is_empty() {
        return Err(PathSecError::InvalidComponent(name.clone()));
    }
    if name == "." || name == ".." {
        return Err(PathSecError::InvalidComponent(name.clone()));
    }
    if name.len() > NAME_MAX {
        return Err(PathSecError::InvalidComponent(name.clone()));
    }

    let bytes: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == '/' {
            while i + 1 < bytes.len() && bytes[i + 1] == '/' {
                i += 1;
            }
            let is_trailing = i == bytes.len() - 1;
            if is_trailing && !out.is_empty() {
                break;
            }
            out.push('_');
        } else {
            out.push(bytes[i]);
        }
        i += 1;
    }

    if out.is_empty() {
        return Err(PathSecError::InvalidComponent(name.clone()));
    }

    *name = out;
    Ok(())
}

/// Return whether `path` is equal to or nested within `root`, after
/// normalizing both. When `path` is a strict subdirectory of `root`, also
/// report that via the returned `is_subdir` flag.
pub fn inroot(root: &Path, path: &Path) -> Result<(bool, bool)> {
    let normalized_root = normalize_path(root, true)?;
    let normalized_path = normalize_path(path, true)?;

    let root_str = normalized_root.to_string_lossy();
    let path_str = normalized_path.to_string_lossy();

    if path_str.starts_with(root_str.as_ref()) {
        let is_subdir = path_str.len() > root_str.len();
        Ok((true, is_subdir))
    } else {
        Ok((false, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_and_strips_trailing_slash() {
        let mut s = String::from("2024-01-01//12:00/");
        normalize_path_component(&mut s).unwrap();
        assert_eq!(s, "2024-01-01_12:00");
    }

    #[test]
    fn rejects_dot_and_dotdot() {
        let mut s = String::from(".");
        assert!(normalize_path_component(&mut s).is_err());
        let mut s = String::from("..");
        assert!(normalize_path_component(&mut s).is_err());
    }

    #[test]
    fn rejects_empty() {
        let mut s = String::new();
        assert!(normalize_path_component(&mut s).is_err());
    }

    #[test]
    fn normalize_collapses_dotdot() {
        let resolved = normalize_path(Path::new("/a/b/../c"), false).unwrap();
        assert_eq!(resolved, PathBuf::from("/a/c"));
    }

    #[test]
    fn normalize_adds_trailing_slash_when_requested() {
        let resolved = normalize_path(Path::new("/a/b"), true).unwrap();
        assert_eq!(resolved, PathBuf::from("/a/b/"));
    }

    #[test]
    fn inroot_detects_subdir() {
        let (is_in, is_sub) = inroot(Path::new("/a/b"), Path::new("/a/b/c")).unwrap();
        assert!(is_in);
        assert!(is_sub);
    }

    #[test]
    fn inroot_rejects_sibling() {
        let (is_in, _) = inroot(Path::new("/a/b"), Path::new("/a/bb")).unwrap();
        assert!(!is_in);
    }

    #[test]
    fn inroot_equal_is_not_subdir() {
        let (is_in, is_sub) = inroot(Path::new("/a/b"), Path::new("/a/b")).unwrap();
        assert!(is_in);
        assert!(!is_sub);
    }
}
