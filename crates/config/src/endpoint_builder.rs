//! Resolves one `backup` block's settings into a validated endpoint.

use crate::interval::build_intervals;
use crate::settings::Resolver;
use crate::ConfigError;
use snapmodel::Endpoint;
use std::path::Path;
use std::time::SystemTime;

/// A [`snapmodel::Endpoint`] plus the settings that only matter while
/// provisioning its local root, not during day to day sync/rotate work.
#[derive(Debug, Clone)]
pub struct ResolvedEndpoint {
    /// The validated endpoint.
    pub endpoint: Endpoint,
    /// Whether the local root directory tree should be created if missing.
    pub createroot: bool,
    /// An optional group allowed to read (but never write) the endpoint's
    /// root, resolved from the second value of the `root` setting.
    pub shared_gid: Option<u32>,
}

/// Resolve `resolver` (a per-endpoint table layered over the global and
/// default tables) into a [`ResolvedEndpoint`].
pub fn build_endpoint(resolver: &Resolver<'_>, now: SystemTime) -> Result<ResolvedEndpoint, ConfigError> {
    let root = resolver
        .multi_setting("root")
        .ok_or(ConfigError::MissingRequired("root"))?;
    let root_path = root.first().ok_or(ConfigError::MissingRequired("root"))?;
    if !Path::new(root_path).is_absolute() {
        return Err(ConfigError::RootNotAbsolute(root_path.clone()));
    }

    let createroot = resolver
        .bool_setting("createroot")
        .ok_or(ConfigError::InvalidBoolean("createroot"))?;

    let ruser = non_empty(resolver.setting("ruser"), "ruser")?;
    let hostname = non_empty(resolver.setting("hostname"), "hostname")?;
    let rpath = non_empty(resolver.setting("rpath"), "rpath")?;

    let backupid = format!("{hostname}:{rpath}");

    // Precedence of names over numeric ids follows chown(1)/POSIX: try a
    // name lookup first, and only parse the setting as a raw id if no such
    // name exists.
    let shared_gid = match root.get(1) {
        Some(token) => Some(resolve_gid(token).or_else(|| resolver.numeric_setting("shared").map(|v| v as u32)).ok_or_else(|| {
            ConfigError::UnresolvedId("shared group", token.clone(), backupid.clone())
        })?),
        None => None,
    };

    let user = resolver
        .setting("user")
        .ok_or_else(|| ConfigError::MissingRequired("user"))?;
    let (uid, mut gid) = resolve_user(user)
        .ok_or_else(|| ConfigError::UnresolvedId("user", user.to_string(), backupid.clone()))?;
    if uid == 0 {
        return Err(ConfigError::UnsafeSuperuser(backupid.clone()));
    }

    if let Some(group) = resolver.setting("group") {
        gid = resolve_gid(group)
            .ok_or_else(|| ConfigError::UnresolvedId("group", group.to_string(), backupid.clone()))?;
    }

    let mut rsync_exit = Vec::new();
    if let Some(codes) = resolver.multi_setting("rsyncexit") {
        for code in codes {
            rsync_exit.push(
                code.parse::<i32>()
                    .map_err(|_| ConfigError::InvalidRsyncExit(code.clone()))?,
            );
        }
    }

    let intervals = build_intervals(resolver, now)?;

    let mut endpoint = Endpoint::new(root_path.as_str(), ruser, hostname, rpath, uid, gid, intervals)?;
    endpoint.set_rsync_bin(resolver.setting("rsyncbin").map(str::to_string));
    if let Some(args) = resolver.multi_setting("rsyncargs") {
        endpoint.set_rsync_args(args.to_vec());
    }
    endpoint.set_rsync_accept_exit_codes(rsync_exit);
    endpoint.set_postexec(resolver.setting("exec").map(str::to_string));

    Ok(ResolvedEndpoint {
        endpoint,
        createroot,
        shared_gid,
    })
}

fn non_empty<'a>(setting: Option<&'a str>, key: &'static str) -> Result<&'a str, ConfigError> {
    match setting {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::MissingRequired(key)),
    }
}

/// Resolve a gid by name first, falling back to parsing `token` as a raw
/// numeric id.
fn resolve_gid(token: &str) -> Option<u32> {
    if let Ok(Some(group)) = nix::unistd::Group::from_name(token) {
        return Some(group.gid.as_raw());
    }
    token.parse().ok()
}

/// Resolve a uid/gid pair by user name first, falling back to a numeric uid
/// and, when that uid has no passwd entry, using the uid itself as the gid.
fn resolve_user(token: &str) -> Option<(u32, u32)> {
    if let Ok(Some(user)) = nix::unistd::User::from_name(token) {
        return Some((user.uid.as_raw(), user.gid.as_raw()));
    }
    let uid: u32 = token.parse().ok()?;
    match nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid)) {
        Ok(Some(user)) => Some((user.uid.as_raw(), user.gid.as_raw())),
        _ => Some((uid, uid)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{defaults, Table, ENDPOINT_KEYS, GLOBAL_AND_ENDPOINT_KEYS};

    fn at_secs(secs: i64) -> SystemTime {
        SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(secs as u64)
    }

    #[test]
    fn rejects_relative_root() {
        let defaults = defaults();
        let mut global = Table::new(GLOBAL_AND_ENDPOINT_KEYS);
        global.set("root", vec!["srv/backups".to_string()]);
        global.set("user", vec!["1000".to_string()]);
        global.set("hostname", vec!["box1".to_string()]);
        global.set("rpath", vec!["/data".to_string()]);
        global.set("hourly", vec!["4".to_string()]);
        let endpoint = Table::new(ENDPOINT_KEYS);
        let resolver = Resolver::new(&endpoint, &global, &defaults);

        let err = build_endpoint(&resolver, at_secs(0)).unwrap_err();
        assert!(matches!(err, ConfigError::RootNotAbsolute(_)));
    }

    #[test]
    fn rejects_superuser() {
        let defaults = defaults();
        let mut global = Table::new(GLOBAL_AND_ENDPOINT_KEYS);
        global.set("root", vec!["/srv/backups".to_string()]);
        global.set("user", vec!["0".to_string()]);
        global.set("hostname", vec!["box1".to_string()]);
        global.set("rpath", vec!["/data".to_string()]);
        global.set("hourly", vec!["4".to_string()]);
        let endpoint = Table::new(ENDPOINT_KEYS);
        let resolver = Resolver::new(&endpoint, &global, &defaults);

        let err = build_endpoint(&resolver, at_secs(0)).unwrap_err();
        assert!(matches!(err, ConfigError::UnsafeSuperuser(_)));
    }

    #[test]
    fn numeric_user_without_passwd_entry_uses_uid_as_gid() {
        let defaults = defaults();
        let mut global = Table::new(GLOBAL_AND_ENDPOINT_KEYS);
        global.set("root", vec!["/srv/backups".to_string()]);
        global.set("user", vec!["65_001".to_string().replace('_', "")]);
        global.set("hostname", vec!["box1".to_string()]);
        global.set("rpath", vec!["/data".to_string()]);
        global.set("hourly", vec!["4".to_string()]);
        let endpoint = Table::new(ENDPOINT_KEYS);
        let resolver = Resolver::new(&endpoint, &global, &defaults);

        let resolved = build_endpoint(&resolver, at_secs(0)).unwrap();
        assert_eq!(resolved.endpoint.uid(), 65001);
        assert_eq!(resolved.endpoint.gid(), 65001);
    }
}
