//! Date/time utilities.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Parse a stored timestamp.
///
/// Accepts RFC3339 (any offset, converted to UTC) and the SQLite
/// `YYYY-MM-DD HH:MM:SS` format (assumed UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }

    None
}

/// Format a timestamp for storage.
///
/// Always RFC3339 in UTC with microsecond precision, so that the textual
/// order of two stored values matches their chronological order.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Midnight (UTC) of the day containing `dt`.
pub fn start_of_day(dt: &DateTime<Utc>) -> DateTime<Utc> {
    dt.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(*dt)
}
