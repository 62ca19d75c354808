//! Building the rsync command line the syncer execs, kept as a pure
//! function so the argument order and flags can be unit tested without
//! forking anything.

use snapmodel::Endpoint;
use std::path::Path;

/// Default rsync binary name used when an endpoint has not overridden it.
pub const DEFAULT_RSYNC_BIN: &str = "rsync";

/// Build the full argv (argv\[0\] included) for the rsync invocation that
/// populates `destdir` (relative to the endpoint's sync directory),
/// optionally hard-linking unchanged files from `link_dest`.
///
/// `verbosity` follows the same signed convention as [`cli::Cli::verbosity`]:
/// negative passes `-q`, and each level above `1` adds one more `-v`.
///
/// Mirrors `execrsync()`: the fixed flags always come first, then
/// `--link-dest` if a prior snapshot exists, then verbosity flags, then the
/// endpoint's own extra arguments, and finally the remote source and local
/// destination. The remote source is given a trailing slash when `rpath`
/// does not already end in one, so rsync copies `rpath`'s contents into
/// `destdir` rather than creating a nested directory named after it.
pub fn build_argv(
    endpoint: &Endpoint,
    local_path: &Path,
    destdir: &str,
    link_dest: Option<&str>,
    verbosity: i32,
) -> Vec<String> {
    let rsync_bin = endpoint.rsync_bin().unwrap_or(DEFAULT_RSYNC_BIN);
    let argv0 = Path::new(rsync_bin)
        .file_name()
        .map_or_else(|| rsync_bin.to_string(), |n| n.to_string_lossy().into_owned());

    let mut argv = vec![
        argv0,
        "-az".to_string(),
        "--delete".to_string(),
        "--numeric-ids".to_string(),
        "--no-specials".to_string(),
        "--no-devices".to_string(),
        "--chroot".to_string(),
        local_path.display().to_string(),
        "--dropsuper".to_string(),
        endpoint.uid().to_string(),
    ];

    if let Some(link_dest) = link_dest {
        argv.push(format!("--link-dest={link_dest}"));
    }

    if verbosity < 0 {
        argv.push("-q".to_string());
    } else if verbosity > 1 {
        for _ in 1..verbosity {
            argv.push("-v".to_string());
        }
    }

    argv.extend(endpoint.rsync_args().iter().cloned());

    let rpath = endpoint.rpath();
    let source = if rpath.is_empty() || rpath.ends_with('/') {
        format!("{}@{}:{}", endpoint.ruser(), endpoint.hostname(), rpath)
    } else {
        format!("{}@{}:{}/", endpoint.ruser(), endpoint.hostname(), rpath)
    };
    argv.push(source);
    argv.push(destdir.to_string());

    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapmodel::Interval;

    fn endpoint() -> Endpoint {
        Endpoint::new(
            "/srv/backup/box1",
            "backup",
            "box1.example",
            "/data",
            1000,
            1000,
            vec![Interval::new("hourly", 4, 3600).unwrap()],
        )
        .unwrap()
    }

    #[test]
    fn builds_fixed_flags_in_order() {
        let ep = endpoint();
        let argv = build_argv(&ep, Path::new("/srv/backup/box1/host_data"), ".", None, 0);
        assert_eq!(
            argv,
            vec![
                "rsync",
                "-az",
                "--delete",
                "--numeric-ids",
                "--no-specials",
                "--no-devices",
                "--chroot",
                "/srv/backup/box1/host_data",
                "--dropsuper",
                "1000",
                "backup@box1.example:/data/",
                ".",
            ]
        );
    }

    #[test]
    fn appends_link_dest_when_a_prior_snapshot_exists() {
        let ep = endpoint();
        let argv = build_argv(
            &ep,
            Path::new("/srv/backup/box1/host_data"),
            ".",
            Some("../hourly.1"),
            0,
        );
        assert!(argv.contains(&"--link-dest=../hourly.1".to_string()));
    }

    #[test]
    fn quiet_adds_q_and_verbose_repeats_v() {
        let ep = endpoint();
        let quiet = build_argv(&ep, Path::new("/x"), ".", None, -1);
        assert!(quiet.contains(&"-q".to_string()));

        let loud = build_argv(&ep, Path::new("/x"), ".", None, 3);
        assert_eq!(loud.iter().filter(|a| *a == "-v").count(), 2);
    }

    #[test]
    fn rpath_already_ending_in_slash_is_not_doubled() {
        let ep = Endpoint::new(
            "/srv/backup/box1",
            "backup",
            "box1.example",
            "/data/",
            1000,
            1000,
            vec![Interval::new("hourly", 4, 3600).unwrap()],
        )
        .unwrap();
        let argv = build_argv(&ep, Path::new("/x"), ".", None, 0);
        assert!(argv.contains(&"backup@box1.example:/data/".to_string()));
    }

    #[test]
    fn user_supplied_extra_args_are_appended_before_the_source() {
        let mut ep = endpoint();
        ep.set_rsync_args(vec!["--bwlimit=1000".to_string()]);
        let argv = build_argv(&ep, Path::new("/x"), ".", None, 0);
        let extra_pos = argv.iter().position(|a| a == "--bwlimit=1000").unwrap();
        let source_pos = argv
            .iter()
            .position(|a| a.starts_with("backup@"))
            .unwrap();
        assert!(extra_pos < source_pos);
    }
}
