//! Resolves the `hourly`/`daily`/`weekly`/`monthly` settings into
//! [`snapmodel::Interval`] values.

use crate::settings::Resolver;
use crate::ConfigError;
use snapmodel::Interval;
use std::time::SystemTime;

const SECS_PER_HOUR: i64 = 3600;
const SECS_PER_DAY: i64 = SECS_PER_HOUR * 24;
const SECS_PER_WEEK: i64 = SECS_PER_DAY * 7;

/// Build the ordered interval list for one endpoint from its resolved
/// settings. `now` anchors the `monthly` interval's lifetime to the number
/// of days in the current calendar month, same as the original's
/// `daysinmonth(starttime)`.
///
/// Returns [`ConfigError::NoIntervals`] if every configured interval's
/// retention count is zero or absent, matching the requirement that an
/// endpoint retain at least one snapshot somewhere.
pub fn build_intervals(resolver: &Resolver<'_>, now: SystemTime) -> Result<Vec<Interval>, ConfigError> {
    let mut intervals = Vec::new();

    if let Some(count) = positive_count(resolver, "hourly")? {
        intervals.push(Interval::new("hourly", count, SECS_PER_HOUR)?);
    }
    if let Some(count) = positive_count(resolver, "daily")? {
        intervals.push(Interval::new("daily", count, SECS_PER_DAY)?);
    }
    if let Some(count) = positive_count(resolver, "weekly")? {
        intervals.push(Interval::new("weekly", count, SECS_PER_WEEK)?);
    }
    if let Some(count) = positive_count(resolver, "monthly")? {
        let lifetime = SECS_PER_DAY * i64::from(days_in_month(now));
        intervals.push(Interval::new("monthly", count, lifetime)?);
    }

    if intervals.is_empty() {
        return Err(ConfigError::NoIntervals);
    }

    Ok(intervals)
}

fn positive_count(resolver: &Resolver<'_>, key: &str) -> Result<Option<u32>, ConfigError> {
    let Some(raw) = resolver.setting(key) else {
        return Ok(None);
    };
    let count: i64 = raw
        .parse()
        .map_err(|_| ConfigError::InvalidNumber(key.to_string(), raw.to_string()))?;
    if count <= 0 {
        return Ok(None);
    }
    Ok(Some(count as u32))
}

/// The number of days in the calendar month containing `now`, in UTC.
///
/// Implemented with Howard Hinnant's `civil_from_days` algorithm rather than
/// pulling in a date/time crate for a single calculation.
fn days_in_month(now: SystemTime) -> u32 {
    let days = now
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64 / SECS_PER_DAY)
        .unwrap_or(0);
    let (year, month, _) = civil_from_days(days);
    days_in_civil_month(year, month)
}

fn is_leap_year(year: i64) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

fn days_in_civil_month(year: i64, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => unreachable!("month out of range"),
    }
}

/// Convert a day count since the Unix epoch into a `(year, month, day)`
/// proleptic Gregorian civil date. Ported from Howard Hinnant's public
/// domain `chrono::civil_from_days` algorithm.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{defaults, Table, ENDPOINT_KEYS, GLOBAL_AND_ENDPOINT_KEYS};

    fn at_secs(secs: i64) -> SystemTime {
        SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(secs as u64)
    }

    #[test]
    fn february_of_a_leap_year_has_29_days() {
        // 2024-02-15 UTC.
        assert_eq!(days_in_month(at_secs(1_707_955_200)), 29);
    }

    #[test]
    fn february_of_a_non_leap_year_has_28_days() {
        // 2023-02-15 UTC.
        assert_eq!(days_in_month(at_secs(1_676_419_200)), 28);
    }

    #[test]
    fn builds_only_the_configured_intervals() {
        let defaults = defaults();
        let mut global = Table::new(GLOBAL_AND_ENDPOINT_KEYS);
        global.set("hourly", vec!["4".to_string()]);
        global.set("daily", vec!["7".to_string()]);
        let endpoint = Table::new(ENDPOINT_KEYS);
        let resolver = Resolver::new(&endpoint, &global, &defaults);

        let intervals = build_intervals(&resolver, at_secs(1_707_955_200)).unwrap();
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].name(), "hourly");
        assert_eq!(intervals[1].name(), "daily");
    }

    #[test]
    fn no_positive_interval_is_an_error() {
        let defaults = defaults();
        let global = Table::new(GLOBAL_AND_ENDPOINT_KEYS);
        let endpoint = Table::new(ENDPOINT_KEYS);
        let resolver = Resolver::new(&endpoint, &global, &defaults);
        assert!(matches!(
            build_intervals(&resolver, at_secs(0)),
            Err(ConfigError::NoIntervals)
        ));
    }
}
