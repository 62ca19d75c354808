#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` defines the command-line surface of the `snapcycle` binary: which
//! configuration file to read, whether to only validate it, an optional
//! substring filter restricting which endpoints to act on, and a signed
//! verbosity counter.
//!
//! # Design
//!
//! [`Cli`] is a [`clap::Parser`] derive. Every flag maps one-to-one onto the
//! original tool's `getopt` set (`-c`, `-f`, `-h`, `-n`, `-q`, `-s`, `-v`,
//! `-V`); `-h`/`-V` are handled by `clap` itself. `-q` and `-v` are counted
//! separately and combined by [`Cli::verbosity`] into the single signed
//! value the rest of snapcycle expects, rather than exposing two raw
//! counters callers would have to subtract themselves.
//!
//! # Errors
//!
//! Parsing fails the same way any `clap` parser does (unknown flag, missing
//! value, extra positional argument); an empty `-s` filter is rejected
//! explicitly rather than silently matching everything.
//!
//! # Examples
//!
//! ```
//! use cli::Cli;
//! use clap::Parser;
//!
//! let cli = Cli::parse_from(["snapcycle", "-v", "-v", "-s", "box1"]);
//! assert_eq!(cli.verbosity(), 2);
//! assert_eq!(cli.host_filters, vec!["box1".to_string()]);
//! ```

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// The default configuration file path, used when `-c` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/snapcycle.conf";

/// Command-line arguments for `snapcycle`.
#[derive(Debug, Parser)]
#[command(
    name = "snapcycle",
    version,
    about = "Privilege-separated rsync snapshot backup orchestrator"
)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Run a backup even if its interval has not yet elapsed.
    #[arg(short = 'f', long = "force")]
    pub force: bool,

    /// Parse and validate the configuration file, then exit without backing
    /// anything up.
    #[arg(short = 'n', long = "check")]
    pub check_only: bool,

    /// Restrict which endpoints run, matching by substring against each
    /// endpoint's `hostname:rpath` identifier. May be given more than once;
    /// an endpoint runs if it matches any filter. Rejects an empty string.
    #[arg(short = 's', long = "host-filter", value_parser = non_empty_filter)]
    pub host_filters: Vec<String>,

    #[arg(short = 'q', action = ArgAction::Count, help = "Decrease verbosity; may be repeated")]
    quiet: u8,

    #[arg(short = 'v', action = ArgAction::Count, help = "Increase verbosity; may be repeated")]
    verbose: u8,
}

impl Cli {
    /// The net verbosity level: `-v` occurrences minus `-q` occurrences.
    #[must_use]
    pub fn verbosity(&self) -> i32 {
        i32::from(self.verbose) - i32::from(self.quiet)
    }
}

fn non_empty_filter(s: &str) -> Result<String, String> {
    if s.is_empty() {
        Err("empty host filter specified".to_string())
    } else {
        Ok(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_nets_v_and_q() {
        let cli = Cli::parse_from(["snapcycle", "-v", "-v", "-v", "-q"]);
        assert_eq!(cli.verbosity(), 2);
    }

    #[test]
    fn defaults_to_the_standard_config_path() {
        let cli = Cli::parse_from(["snapcycle"]);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(cli.host_filters.is_empty());
    }

    #[test]
    fn rejects_empty_host_filter() {
        let result = Cli::try_parse_from(["snapcycle", "-s", ""]);
        assert!(result.is_err());
    }

    #[test]
    fn accepts_repeated_host_filters() {
        let cli = Cli::parse_from(["snapcycle", "-s", "a.example", "-s", "b.example"]);
        assert_eq!(cli.host_filters, vec!["a.example", "b.example"]);
    }
}
