//! Timestamp helpers.
//!
//! Notes store timestamps as ISO-8601 UTC strings with millisecond precision.
//! `now_utc` truncates to milliseconds so a value survives a format/parse
//! round trip unchanged.

use chrono::{DateTime, SecondsFormat, Utc};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Current UTC time, truncated to millisecond precision
pub fn now_utc() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Parse datetime from RFC 3339 string
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format datetime as `YYYY-MM-DDTHH:MM:SS.mmmZ`
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Fractional days elapsed from `earlier` to `later` (negative if reversed).
pub fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / MILLIS_PER_DAY
}
