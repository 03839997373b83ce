//! Time related utils.

use crate::{Error, Result};
use chrono::Utc;

/// DateTime is the UTC timestamp used across eslog.
pub type DateTime = chrono::DateTime<Utc>;

/// Create a new DateTime for now.
#[inline]
pub fn now() -> DateTime {
    Utc::now()
}

/// Format time into date: `20220301`
pub fn format_date(t: DateTime) -> String {
    t.format("%Y%m%d").to_string()
}

/// Format time into ISO8601 basic format: `20220313T072004Z`
pub fn format_iso8601(t: DateTime) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Format time into RFC3339 with milliseconds: `2022-03-13T07:20:04.123Z`
pub fn format_rfc3339(t: DateTime) -> String {
    t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Parse time from RFC3339.
///
/// All these formats are supported:
///
/// - `2022-03-13T07:20:04Z`
/// - `2022-03-13T07:20:04.123Z`
/// - `2022-03-13T07:20:04+08:00`
pub fn parse_rfc3339(s: &str) -> Result<DateTime> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|v| v.with_timezone(&Utc))
        .map_err(|e| {
            Error::unexpected("failed to parse rfc3339 time")
                .with_source(e)
                .with_context(format!("value: {s}"))
        })
}
