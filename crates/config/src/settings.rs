//! The three-tier settings tables a `backup` block is resolved against:
//! endpoint-specific settings override global settings override the
//! built-in defaults.

use std::collections::HashMap;

/// One resolved value: scfg directives carry a first value plus zero or
/// more additional "multi-value" terms (`root /srv/backups admins` has
/// value `/srv/backups` and one extra term `admins`).
#[derive(Debug, Clone, Default)]
pub struct Value {
    terms: Vec<String>,
}

impl Value {
    /// Build a value from every parameter term following the directive's
    /// key.
    pub fn from_terms(terms: Vec<String>) -> Self {
        Self { terms }
    }

    /// The first term, if any.
    pub fn first(&self) -> Option<&str> {
        self.terms.first().map(String::as_str)
    }

    /// Every term, in order.
    pub fn all(&self) -> &[String] {
        &self.terms
    }
}

/// A settings table restricted to a fixed set of recognized keys, mirroring
/// one of the original tool's `tmpkv` tables.
#[derive(Debug, Default)]
pub struct Table {
    allowed: &'static [&'static str],
    values: HashMap<String, Value>,
}

impl Table {
    /// Build an empty table recognizing exactly `allowed` keys.
    pub fn new(allowed: &'static [&'static str]) -> Self {
        Self {
            allowed,
            values: HashMap::new(),
        }
    }

    /// Whether `key` is a recognized member of this table.
    pub fn is_known_key(&self, key: &str) -> bool {
        self.allowed.contains(&key)
    }

    /// Whether `key` currently has a value set.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Record `terms` under `key`. Returns `false` if `key` is not a
    /// recognized member of this table (the caller should treat that as an
    /// "unknown keyword" error, same as `saveset()` failing).
    pub fn set(&mut self, key: &str, terms: Vec<String>) -> bool {
        if !self.is_known_key(key) {
            return false;
        }
        self.values.insert(key.to_string(), Value::from_terms(terms));
        true
    }

    /// The raw value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

/// Looks a key up across the endpoint table, then the global table, then
/// the built-in defaults, returning the first one that has it set —
/// equivalent to the original's `gettmpkv()`/`getsetting()` precedence
/// chain.
pub struct Resolver<'a> {
    endpoint: &'a Table,
    global: &'a Table,
    defaults: &'a Table,
}

impl<'a> Resolver<'a> {
    /// Build a resolver over the three tiers, checked in that order.
    pub fn new(endpoint: &'a Table, global: &'a Table, defaults: &'a Table) -> Self {
        Self {
            endpoint,
            global,
            defaults,
        }
    }

    /// The raw value for `key`, from whichever tier sets it first.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.endpoint
            .get(key)
            .or_else(|| self.global.get(key))
            .or_else(|| self.defaults.get(key))
    }

    /// The first term of `key`'s value.
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.value(key).and_then(Value::first)
    }

    /// Every term of `key`'s value.
    pub fn multi_setting(&self, key: &str) -> Option<&[String]> {
        self.value(key).map(Value::all)
    }

    /// `key` parsed as a `"yes"`/`"no"` boolean.
    pub fn bool_setting(&self, key: &str) -> Option<bool> {
        match self.setting(key)? {
            "yes" => Some(true),
            "no" => Some(false),
            _ => None,
        }
    }

    /// `key` parsed as a number.
    pub fn numeric_setting(&self, key: &str) -> Option<i64> {
        self.setting(key)?.parse().ok()
    }
}

/// Recognized keys for the built-in default table (`defset`).
pub const DEFAULT_KEYS: &[&str] = &[
    "root",
    "createroot",
    "user",
    "ruser",
    "hourly",
    "daily",
    "weekly",
    "monthly",
];

/// Recognized keys shared by the global and per-endpoint tables.
pub const GLOBAL_AND_ENDPOINT_KEYS: &[&str] = &[
    "root",
    "createroot",
    "user",
    "group",
    "rsyncbin",
    "rsyncargs",
    "rsyncexit",
    "hourly",
    "daily",
    "weekly",
    "monthly",
    "ruser",
    "hostname",
    "rpath",
    "exec",
];

/// Recognized keys for the per-endpoint table (`tmpepset`): everything the
/// global table has, plus `backup` itself so the iterator does not choke on
/// re-encountering the directive that introduced the block.
pub const ENDPOINT_KEYS: &[&str] = &[
    "root",
    "createroot",
    "user",
    "group",
    "rsyncbin",
    "rsyncargs",
    "rsyncexit",
    "hourly",
    "daily",
    "weekly",
    "monthly",
    "ruser",
    "hostname",
    "rpath",
    "exec",
    "backup",
];

/// Build the built-in default table (`ruser` defaults to `"root"`,
/// `createroot` to `"yes"`, the interval counts to `"0"`).
pub fn defaults() -> Table {
    let mut t = Table::new(DEFAULT_KEYS);
    t.set("createroot", vec!["yes".to_string()]);
    t.set("ruser", vec!["root".to_string()]);
    t.set("hourly", vec!["0".to_string()]);
    t.set("daily", vec!["0".to_string()]);
    t.set("weekly", vec!["0".to_string()]);
    t.set("monthly", vec!["0".to_string()]);
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_overrides_global_overrides_default() {
        let defaults = defaults();
        let mut global = Table::new(GLOBAL_AND_ENDPOINT_KEYS);
        global.set("hourly", vec!["6".to_string()]);
        let mut endpoint = Table::new(ENDPOINT_KEYS);
        endpoint.set("hourly", vec!["3".to_string()]);

        let resolver = Resolver::new(&endpoint, &global, &defaults);
        assert_eq!(resolver.setting("hourly"), Some("3"));
        assert_eq!(resolver.setting("daily"), Some("0"));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let mut t = Table::new(DEFAULT_KEYS);
        assert!(!t.set("nonsense", vec!["x".to_string()]));
    }

    #[test]
    fn root_multi_value_carries_second_term() {
        let mut t = Table::new(GLOBAL_AND_ENDPOINT_KEYS);
        t.set(
            "root",
            vec!["/srv/backups".to_string(), "admins".to_string()],
        );
        let v = t.get("root").unwrap();
        assert_eq!(v.first(), Some("/srv/backups"));
        assert_eq!(v.all().get(1).map(String::as_str), Some("admins"));
    }
}
