#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` wires snapcycle's `-q`/`-v` verbosity counter into a
//! [`tracing_subscriber`] subscriber, and formats durations the way the
//! rotator reports a snapshot's remaining time-to-live or age.
//!
//! # Design
//!
//! [`init`] maps a signed verbosity counter onto a [`tracing::Level`]
//! filter: quiet and default runs only surface warnings and errors, `-v`
//! adds informational progress lines, `-vv` adds per-endpoint debug detail,
//! and `-vvv` or higher dumps the parsed configuration tree as well. An
//! explicit `RUST_LOG` environment variable always takes precedence, so an
//! operator debugging a specific module does not have to fight the `-v`
//! mapping.
//!
//! [`human_duration`] buckets a count of seconds into the coarsest unit that
//! still reads naturally (seconds, minutes, hours, days, or weeks), matching
//! the thresholds the rotator has always used in its progress output.
//!
//! # Errors
//!
//! [`LoggingError`] reports a subscriber that was already installed.
//!
//! # Examples
//!
//! ```
//! use logging::human_duration;
//!
//! assert_eq!(human_duration(1), "1 second");
//! assert_eq!(human_duration(90), "90 seconds");
//! assert_eq!(human_duration(7200), "2 hours");
//! ```

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Errors produced while installing the global tracing subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// A subscriber was already installed for this process.
    #[error("a tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Map a signed `-v`/`-q` verbosity counter to a base log level.
///
/// `-q` decrements the counter and can push it negative, which this maps to
/// [`Level::ERROR`] (warnings suppressed too); the default (`0`) is
/// [`Level::WARN`].
fn level_for(verbosity: i32) -> Level {
    match verbosity {
        i32::MIN..=-1 => Level::ERROR,
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install a global [`tracing`] subscriber whose default filter is derived
/// from `verbosity` (see [`level_for`]), honoring `RUST_LOG` if set.
///
/// Returns [`LoggingError::AlreadyInitialized`] if a subscriber is already
/// installed, which should only happen if this is called more than once in
/// the same process (tests aside).
pub fn init(verbosity: i32) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbosity).to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)
}

/// Format `seconds` as a human-readable duration, picking the coarsest unit
/// (seconds, minutes, hours, days, or weeks) under which the value still
/// reads as at least `1`.
///
/// Mirrors the original thresholds exactly: singular "1 second" is a special
/// case, everything under two minutes stays in seconds, under two hours
/// becomes minutes, under two days becomes hours, under two weeks becomes
/// days, and anything longer is reported in weeks.
#[must_use]
pub fn human_duration(seconds: i64) -> String {
    const MINUTE: i64 = 60;
    const HOUR: i64 = 3600;
    const DAY: i64 = 86_400;
    const WEEK: i64 = DAY * 7;

    if seconds == 1 {
        "1 second".to_string()
    } else if seconds < 2 * MINUTE {
        format!("{seconds} seconds")
    } else if seconds < 2 * HOUR {
        format!("{} minutes", seconds / MINUTE)
    } else if seconds < 2 * DAY {
        format!("{} hours", seconds / HOUR)
    } else if seconds < 2 * WEEK {
        format!("{} days", seconds / DAY)
    } else {
        format!("{} weeks", seconds / WEEK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singular_second_is_special_cased() {
        assert_eq!(human_duration(1), "1 second");
    }

    #[test]
    fn stays_in_seconds_under_two_minutes() {
        assert_eq!(human_duration(119), "119 seconds");
    }

    #[test]
    fn switches_to_minutes_at_two_minutes() {
        assert_eq!(human_duration(120), "2 minutes");
    }

    #[test]
    fn switches_to_hours_at_two_hours() {
        assert_eq!(human_duration(2 * 3600), "2 hours");
    }

    #[test]
    fn switches_to_days_at_two_days() {
        assert_eq!(human_duration(2 * 86_400), "2 days");
    }

    #[test]
    fn switches_to_weeks_beyond_two_weeks() {
        assert_eq!(human_duration(3 * 7 * 86_400), "3 weeks");
    }

    #[test]
    fn verbosity_levels_escalate() {
        assert_eq!(level_for(-5), Level::ERROR);
        assert_eq!(level_for(0), Level::WARN);
        assert_eq!(level_for(1), Level::INFO);
        assert_eq!(level_for(2), Level::DEBUG);
        assert_eq!(level_for(3), Level::TRACE);
    }
}
