#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `config` turns an scfg configuration file into a validated list of
//! [`endpoint_builder::ResolvedEndpoint`]s, each wrapping a
//! [`snapmodel::Endpoint`].
//!
//! # Design
//!
//! Loading happens in two passes over the parsed directive tree, mirroring
//! the original tool's `parseconfig()`:
//!
//! 1. Every top-level directive other than `backup` is a global setting and
//!    is recorded once into a [`settings::Table`].
//! 2. Every top-level `backup` directive introduces one endpoint. Its value
//!    is a host string (`[user@]host[:path]`, see [`hoststr`]) and its
//!    optional child block can override any endpoint-scoped key. Each
//!    endpoint is resolved against a three-tier [`settings::Resolver`]
//!    (endpoint, then global, then built-in defaults) by
//!    [`endpoint_builder::build_endpoint`].
//!
//! # Invariants
//!
//! - A global setting can only be assigned once; a later duplicate is an
//!   error rather than a silent overwrite.
//! - An endpoint's root directory may not be nested inside another
//!   endpoint's root: the second pass rejects any `backup` block whose root
//!   is a strict subdirectory of one already resolved.
//! - At least one interval in an endpoint must retain more than zero
//!   snapshots.
//!
//! # Errors
//!
//! [`ConfigError`] reports file I/O failures, scfg syntax errors, unknown or
//! duplicated keys, and every semantic validation failure
//! [`endpoint_builder::build_endpoint`] can produce.
//!
//! # Examples
//!
//! ```no_run
//! use config::load;
//! use std::path::Path;
//!
//! let endpoints = load(Path::new("/etc/snapcycle.conf")).unwrap();
//! for resolved in &endpoints {
//!     println!("{}", resolved.endpoint.id());
//! }
//! ```

mod endpoint_builder;
mod hoststr;
mod interval;
mod settings;

pub use endpoint_builder::{build_endpoint, ResolvedEndpoint};
pub use hoststr::{parse_host_str, HostSpec};
pub use settings::{Resolver, Table};

use settings::{defaults, Table as SettingsTable, ENDPOINT_KEYS, GLOBAL_AND_ENDPOINT_KEYS};
use std::path::Path;
use std::time::SystemTime;

/// Errors produced while loading and resolving a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading the configuration file failed.
    #[error("reading {path:?}: {source}")]
    Io {
        /// The path that could not be read.
        path: std::path::PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file's contents were not valid scfg.
    #[error("syntax error: {0}")]
    Parse(String),
    /// A top-level key outside a `backup` block is not a recognized global
    /// setting.
    #[error("{0:?} is not a global key")]
    UnknownGlobalKey(String),
    /// A global setting appeared more than once.
    #[error("{0:?} should be set only once")]
    DuplicateGlobalSetting(String),
    /// A key inside a `backup` block is not a recognized endpoint setting.
    #[error("unknown endpoint keyword: {0:?}")]
    UnknownEndpointKey(String),
    /// An endpoint setting block nested a block inside one of its own
    /// entries, which this format does not support.
    #[error("endpoint specific settings can not contain nested blocks: {0:?}")]
    NestedBlock(String),
    /// A `backup` directive had no host definition.
    #[error("backup key without host definition")]
    MissingHostDefinition,
    /// A `backup` directive's value was not a valid `[user@]host[:path]`
    /// string.
    #[error("invalid backup value: {0:?}")]
    InvalidHostString(String),
    /// A host string component and the endpoint block both tried to set the
    /// same key.
    #[error("{0} already set to {1:?} in the endpoint block")]
    DuplicateHostComponent(&'static str, String),
    /// A required setting was missing or empty for the named endpoint.
    #[error("missing required parameter {0}")]
    MissingRequired(&'static str),
    /// `createroot` was set to something other than `"yes"`/`"no"`.
    #[error("createroot is not set to either \"yes\" or \"no\"")]
    InvalidBoolean(&'static str),
    /// `root` was not an absolute path.
    #[error("root must be set to an absolute path: {0}")]
    RootNotAbsolute(String),
    /// A user, group, or shared-group setting resolved to neither a known
    /// name nor a valid numeric id.
    #[error("could not determine {0} id of {1:?} for {2}")]
    UnresolvedId(&'static str, String, String),
    /// The resolved user is the superuser, which is never allowed to run an
    /// unprivileged sync.
    #[error("it is unsafe to run rsync as the superuser for {0}")]
    UnsafeSuperuser(String),
    /// An `rsyncexit` entry did not parse as an exit code.
    #[error("rsyncexit contains an invalid exit code: {0:?}")]
    InvalidRsyncExit(String),
    /// An interval's retain count was not a valid number.
    #[error("{0} is not a valid number: {1:?}")]
    InvalidNumber(String, String),
    /// No interval retains more than zero snapshots.
    #[error("specify at least one interval with a positive retention count")]
    NoIntervals,
    /// The interval or endpoint model rejected the resolved settings.
    #[error(transparent)]
    Model(#[from] snapmodel::ModelError),
    /// An endpoint's root is nested inside another endpoint's root.
    #[error("root {0:?} is nested inside the already configured root {1:?}")]
    NestedRoot(String, String),
    /// Normalizing a root path for the nested-root check failed.
    #[error(transparent)]
    Path(#[from] pathsec::PathSecError),
    /// Another endpoint with the same `hostname:rpath` id already exists.
    #[error("another endpoint with id {0:?} already exists")]
    DuplicateEndpoint(String),
}

/// Load and fully resolve every endpoint in the configuration file at
/// `path`.
pub fn load(path: &Path) -> Result<Vec<ResolvedEndpoint>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_str(&contents, SystemTime::now())
}

/// Parse and resolve `contents` as a configuration file, anchoring the
/// `monthly` interval's lifetime to `now`.
pub fn load_str(contents: &str, now: SystemTime) -> Result<Vec<ResolvedEndpoint>, ConfigError> {
    let directives = scfg::parse(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let defaults = defaults();
    let mut global = SettingsTable::new(GLOBAL_AND_ENDPOINT_KEYS);

    for directive in &directives {
        if directive.name == "backup" {
            continue;
        }
        if !global.is_known_key(&directive.name) {
            return Err(ConfigError::UnknownGlobalKey(directive.name.clone()));
        }
        if global.has(&directive.name) {
            return Err(ConfigError::DuplicateGlobalSetting(directive.name.clone()));
        }
        global.set(&directive.name, directive.params.clone());
    }

    let mut resolved = Vec::new();

    for directive in &directives {
        if directive.name != "backup" {
            continue;
        }

        let mut endpoint_table = SettingsTable::new(ENDPOINT_KEYS);
        for child in &directive.children {
            if child.name == "backup" {
                continue;
            }
            if !child.children.is_empty() {
                return Err(ConfigError::NestedBlock(child.name.clone()));
            }
            if !endpoint_table.set(&child.name, child.params.clone()) {
                return Err(ConfigError::UnknownEndpointKey(child.name.clone()));
            }
        }

        let hoststr = directive
            .params
            .first()
            .ok_or(ConfigError::MissingHostDefinition)?;
        let spec = parse_host_str(hoststr)?;

        merge_host_component(&mut endpoint_table, "ruser", spec.ruser)?;
        merge_host_component(&mut endpoint_table, "hostname", spec.hostname)?;
        merge_host_component(&mut endpoint_table, "rpath", spec.rpath)?;

        let resolver = Resolver::new(&endpoint_table, &global, &defaults);
        let endpoint = build_endpoint(&resolver, now)?;

        for already in &resolved {
            let already: &ResolvedEndpoint = already;

            if already.endpoint.id() == endpoint.endpoint.id() {
                return Err(ConfigError::DuplicateEndpoint(endpoint.endpoint.id()));
            }

            let (in_root, is_subdir) =
                pathsec::inroot(already.endpoint.root(), endpoint.endpoint.root())?;
            if in_root && is_subdir {
                return Err(ConfigError::NestedRoot(
                    endpoint.endpoint.root().display().to_string(),
                    already.endpoint.root().display().to_string(),
                ));
            }

            let (reverse_in_root, reverse_is_subdir) =
                pathsec::inroot(endpoint.endpoint.root(), already.endpoint.root())?;
            if reverse_in_root && reverse_is_subdir {
                return Err(ConfigError::NestedRoot(
                    already.endpoint.root().display().to_string(),
                    endpoint.endpoint.root().display().to_string(),
                ));
            }
        }

        resolved.push(endpoint);
    }

    Ok(resolved)
}

fn merge_host_component(
    table: &mut SettingsTable,
    key: &'static str,
    value: Option<String>,
) -> Result<(), ConfigError> {
    let Some(value) = value else {
        return Ok(());
    };
    if table.has(key) {
        return Err(ConfigError::DuplicateHostComponent(key, value));
    }
    table.set(key, vec![value]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_secs(secs: i64) -> SystemTime {
        SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(secs as u64)
    }

    #[test]
    fn loads_a_minimal_single_endpoint_config() {
        let conf = r#"
            user 1000
            hourly 4

            backup box1:/data {
                root /srv/backups/box1
            }
        "#;
        let endpoints = load_str(conf, at_secs(1_707_955_200)).unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].endpoint.hostname(), "box1");
        assert_eq!(endpoints[0].endpoint.rpath(), "/data");
        assert_eq!(endpoints[0].endpoint.root(), Path::new("/srv/backups/box1"));
    }

    #[test]
    fn rejects_duplicate_global_setting() {
        let conf = r#"
            user 1000
            user 1001
        "#;
        let err = load_str(conf, at_secs(0)).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateGlobalSetting(_)));
    }

    #[test]
    fn rejects_nested_endpoint_roots() {
        let conf = r#"
            user 1000
            hourly 4

            backup a.example:/data {
                root /srv/backups
            }

            backup b.example:/data {
                root /srv/backups/nested
            }
        "#;
        let err = load_str(conf, at_secs(0)).unwrap_err();
        assert!(matches!(err, ConfigError::NestedRoot(_, _)));
    }

    #[test]
    fn rejects_nested_endpoint_roots_in_either_direction() {
        let conf = r#"
            user 1000
            hourly 4

            backup a.example:/data {
                root /srv/backups/nested
            }

            backup b.example:/data {
                root /srv/backups
            }
        "#;
        let err = load_str(conf, at_secs(0)).unwrap_err();
        assert!(matches!(err, ConfigError::NestedRoot(_, _)));
    }

    #[test]
    fn rejects_duplicate_endpoint_id() {
        let conf = r#"
            user 1000
            hourly 4

            backup box1.example:/data {
                root /srv/backups/a
            }

            backup box1.example:/data {
                root /srv/backups/b
            }
        "#;
        let err = load_str(conf, at_secs(0)).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateEndpoint(_)));
    }

    #[test]
    fn rejects_unknown_global_key() {
        let conf = "nonsense yes\n";
        let err = load_str(conf, at_secs(0)).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownGlobalKey(_)));
    }
}
