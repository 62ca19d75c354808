//! `snapcycle`: reads its configuration, provisions each endpoint's
//! directories, and forks a privilege-separated rotator/syncer/(postexec)
//! process tree for every host it is configured to back up.

use clap::Parser;
use cli::Cli;
use coordinator::RunOptions;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(error) = logging::init(cli.verbosity()) {
        eprintln!("snapcycle: {error}");
    }

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            tracing::error!(%error, "snapcycle");
            ExitCode::FAILURE
        }
    }
}

/// Load the configuration, honor `-n`/`-s`, and (unless checking only) run
/// every matching endpoint. Returns `Ok(false)` if configuration loaded
/// fine but one or more endpoints failed their backup pass.
fn run(cli: &Cli) -> anyhow::Result<bool> {
    let endpoints = config::load(&cli.config)?;

    if endpoints.is_empty() {
        anyhow::bail!("no hosts to backup");
    }

    if cli.check_only {
        println!("{} OK", cli.config.display());
        return Ok(true);
    }

    let filtered: Vec<_> = endpoints
        .into_iter()
        .filter(|resolved| matches_any_filter(&resolved.endpoint.id(), &cli.host_filters))
        .collect();

    let opts = RunOptions {
        force: cli.force,
        verbosity: cli.verbosity(),
    };

    Ok(coordinator::run_all(&filtered, opts))
}

/// An endpoint runs if no filter is given, or if its `hostname:rpath` id
/// contains any one of the given substrings.
fn matches_any_filter(id: &str, filters: &[String]) -> bool {
    filters.is_empty() || filters.iter().any(|f| id.contains(f.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_list_matches_everything() {
        assert!(matches_any_filter("box1.example:/data", &[]));
    }

    #[test]
    fn substring_filter_matches_by_hostid() {
        let filters = vec!["box1".to_string()];
        assert!(matches_any_filter("box1.example:/data", &filters));
        assert!(!matches_any_filter("box2.example:/data", &filters));
    }
}
