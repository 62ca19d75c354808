//! Deriving an endpoint's local working directory from its root and remote
//! identity.

use pathsec::PathSecError;
use std::path::PathBuf;

/// Build the local directory a single endpoint's children chroot into:
/// `<root>/<hostname>/<rpath>`, with the `hostname/rpath` portion collapsed
/// into one safe path component.
///
/// Mirrors the original's `asprintf("%s/%s", hostname, rpath)` followed by
/// `normalize_pathcomp` and a final `asprintf("%s/%s", root, pathcomp)`: the
/// remote identity becomes a single, slash-free directory name directly
/// under the endpoint root, not a nested `hostname/rpath` tree.
pub fn local_path(root: &std::path::Path, hostname: &str, rpath: &str) -> Result<PathBuf, PathSecError> {
    let mut component = format!("{hostname}/{rpath}");
    pathsec::normalize_path_component(&mut component)?;
    Ok(root.join(component))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn collapses_hostname_and_rpath_into_one_component() {
        let path = local_path(Path::new("/srv/backups"), "box1.example", "/data").unwrap();
        assert_eq!(path, Path::new("/srv/backups/box1.example_data"));
    }

    #[test]
    fn rejects_a_component_that_normalizes_to_nothing() {
        let err = local_path(Path::new("/srv/backups"), "", "").unwrap_err();
        assert!(matches!(err, PathSecError::InvalidComponent(_)));
    }
}
