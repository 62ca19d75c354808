//! Verifying and, where permitted, creating an endpoint's root and local
//! working directories before any child process touches them.

use crate::endpoint_path::local_path;
use config::ResolvedEndpoint;
use pathsec::trust::relax;
use std::path::PathBuf;

/// Errors produced while provisioning an endpoint's on-disk directories.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// The endpoint's root is not an absolute path.
    #[error("root must be set to an absolute path: {0}")]
    RootNotAbsolute(PathBuf),
    /// The root or local path failed the ownership/permission trust check.
    #[error("{0} is untrusted: every existing component must be owned by the superuser and carry no group/other write bit")]
    Untrusted(PathBuf),
    /// The root does not exist and `createroot` is not set.
    #[error("root {0} does not exist and createroot is not \"yes\"")]
    RootMissing(PathBuf),
    /// Deriving the local working directory from hostname/rpath failed.
    #[error(transparent)]
    Path(#[from] pathsec::PathSecError),
}

/// Verify and provision one endpoint's root and local working directory,
/// returning the local path the endpoint's children will chroot into.
///
/// Mirrors the original's per-endpoint provisioning loop: the root directory
/// gets mode `0700` (`0750` if shared with a group), the local working
/// directory gets mode `0711` (`0751` if shared), and an already-trusted but
/// differently-moded directory is reconciled rather than rejected.
pub fn provision(resolved: &ResolvedEndpoint) -> Result<PathBuf, ProvisionError> {
    let ep = &resolved.endpoint;
    let root = ep.root();

    if !root.is_absolute() {
        return Err(ProvisionError::RootNotAbsolute(root.to_path_buf()));
    }

    let root_relax = if resolved.shared_gid.is_some() {
        relax::GROUP_READ | relax::GROUP_EXEC
    } else {
        0
    };

    let root_trust = pathsec::trusted_path(root, root_relax, resolved.shared_gid)?;
    if !root_trust.trusted {
        return Err(ProvisionError::Untrusted(root.to_path_buf()));
    }
    if !root_trust.exists && !resolved.createroot {
        return Err(ProvisionError::RootMissing(root.to_path_buf()));
    }

    let root_mode = if resolved.shared_gid.is_some() {
        0o750
    } else {
        0o700
    };
    let report = pathsec::secure_ensure_dir(root, root_mode, resolved.shared_gid)?;
    if report.updated {
        tracing::warn!(root = %root.display(), "updated ownership and permissions");
    }

    let path = local_path(root, ep.hostname(), ep.rpath())?;

    let path_relax = if resolved.shared_gid.is_some() {
        relax::GROUP_EXEC | relax::OTHER_EXEC | relax::GROUP_READ
    } else {
        relax::GROUP_EXEC | relax::OTHER_EXEC
    };

    let path_trust = pathsec::trusted_path(&path, path_relax, resolved.shared_gid)?;
    if !path_trust.trusted {
        return Err(ProvisionError::Untrusted(path.clone()));
    }

    let path_mode = if resolved.shared_gid.is_some() {
        0o751
    } else {
        0o711
    };
    let report = pathsec::secure_ensure_dir(&path, path_mode, resolved.shared_gid)?;
    if report.updated {
        tracing::warn!(path = %path.display(), "updated ownership and permissions");
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapmodel::{Endpoint, Interval};
    use std::os::unix::fs::PermissionsExt;

    fn resolved(root: &std::path::Path) -> ResolvedEndpoint {
        let endpoint = Endpoint::new(
            root,
            "backup",
            "box1.example",
            "/data",
            1000,
            1000,
            vec![Interval::new("hourly", 4, 3600).unwrap()],
        )
        .unwrap();
        ResolvedEndpoint {
            endpoint,
            createroot: true,
            shared_gid: None,
        }
    }

    #[test]
    fn provisions_root_and_local_path_with_unshared_modes() {
        let base = tempfile::tempdir().unwrap();
        std::fs::set_permissions(base.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
        let root = base.path().join("backups");
        let r = resolved(&root);

        let path = provision(&r).unwrap();
        assert_eq!(path, root.join("box1.example_data"));

        let root_mode = std::fs::metadata(&root).unwrap().permissions().mode() & 0o777;
        assert_eq!(root_mode, 0o700);
        let path_mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(path_mode, 0o711);
    }

    #[test]
    fn rejects_relative_root() {
        let mut r = resolved(std::path::Path::new("/tmp/unused"));
        r.endpoint = Endpoint::new(
            "relative/root",
            "backup",
            "box1.example",
            "/data",
            1000,
            1000,
            vec![Interval::new("hourly", 4, 3600).unwrap()],
        )
        .unwrap();
        let err = provision(&r).unwrap_err();
        assert!(matches!(err, ProvisionError::RootNotAbsolute(_)));
    }

    #[test]
    fn missing_root_without_createroot_is_rejected() {
        let base = tempfile::tempdir().unwrap();
        std::fs::set_permissions(base.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
        let root = base.path().join("does-not-exist");
        let mut r = resolved(&root);
        r.createroot = false;
        let err = provision(&r).unwrap_err();
        assert!(matches!(err, ProvisionError::RootMissing(_)));
    }
}
