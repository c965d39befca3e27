//! Park recency: how long ago a park was listed and whether it still counts as new.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Parks listed at most this many days ago are "new".
pub const NEW_PARK_WINDOW_DAYS: f64 = 30.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Parses the timestamp formats the park and spot feeds use.
///
/// Accepts RFC 3339, naive `YYYY-MM-DD[T ]HH:MM:SS[.fff]` (read as UTC),
/// bare dates, bare four-digit years, and longer all-digit strings holding
/// epoch milliseconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.bytes().all(|b| b.is_ascii_digit()) {
        // a bare year is January 1st of that year
        if raw.len() <= 4 {
            return raw
                .parse::<i32>()
                .ok()
                .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc());
        }
        return raw
            .parse::<i64>()
            .ok()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single());
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Age of a park in fractional days at `now`.
///
/// Missing or unparseable timestamps are infinitely old.
pub fn age_days(created: Option<&str>, now: DateTime<Utc>) -> f64 {
    match created.and_then(parse_timestamp) {
        Some(at) => (now - at).num_milliseconds() as f64 / MILLIS_PER_DAY,
        None => f64::INFINITY,
    }
}

pub fn is_new(age_days: f64) -> bool {
    age_days <= NEW_PARK_WINDOW_DAYS
}
