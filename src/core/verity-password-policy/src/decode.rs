//! Directory timestamp decoding.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// 100-nanosecond ticks per second.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

const YEARS_FROM_1601_TO_1970: i64 = 1970 - 1601;

/// Seconds between 1601-01-01 and 1970-01-01.
///
/// One leap day every four years, minus 1700, 1800 and 1900 which are not
/// leap years.
pub const SECONDS_FROM_1601_TO_1970: i64 =
    (YEARS_FROM_1601_TO_1970 * 365 + YEARS_FROM_1601_TO_1970 / 4 - 3) * 24 * 60 * 60;

/// Decodes a count of 100-nanosecond ticks since 1601-01-01.
///
/// Sub-second precision is truncated. Returns `None` for non-numeric input.
pub fn decode_vendor_epoch(raw: &str) -> Option<DateTime<Utc>> {
    let ticks: i64 = raw.trim().parse().ok()?;
    let seconds_since_1601 = ticks / TICKS_PER_SECOND;
    let seconds_since_1970 = seconds_since_1601 - SECONDS_FROM_1601_TO_1970;
    DateTime::from_timestamp(seconds_since_1970, 0)
}

/// Encodes an instant as 100-nanosecond ticks since 1601-01-01.
pub fn encode_vendor_epoch(instant: DateTime<Utc>) -> i64 {
    (instant.timestamp() + SECONDS_FROM_1601_TO_1970) * TICKS_PER_SECOND
}

/// Parses a date with a `chrono` format string, in UTC.
///
/// Tries an offset-aware date-time first, then a naive date-time, then a
/// bare date at midnight.
pub fn decode_pattern(raw: &str, pattern: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_str(raw, pattern) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, pattern)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
