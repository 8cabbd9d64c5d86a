//! Timestamp conversions
//!
//! All times are handled as signed epoch seconds. Inputs without a zone
//! are taken as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Convert an NCSA timestamp (`10/Oct/2000:13:55:36 -0700`) to epoch seconds
///
/// The first `:` separating date and time is normalized to a space before
/// parsing.
pub fn parse_ncsa(raw: &str) -> Option<i64> {
    let normalized = raw.trim().replacen(':', " ", 1);

    if let Ok(dt) = DateTime::parse_from_str(&normalized, "%d/%b/%Y %H:%M:%S %z") {
        return Some(dt.timestamp());
    }

    NaiveDateTime::parse_from_str(&normalized, "%d/%b/%Y %H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}

/// Convert an ISO-8601 timestamp (`2015-05-13T23:39:43.945958Z`) to epoch seconds
pub fn parse_iso(raw: &str) -> Option<i64> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).timestamp());
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}

/// Parse a user-supplied date bound
///
/// Supports: epoch seconds, RFC 3339, `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DDTHH:MM:SS` and `YYYY-MM-DD` (midnight).
pub fn parse_date_arg(input: &str) -> Option<i64> {
    let input = input.trim();

    if let Ok(secs) = input.parse::<i64>() {
        return Some(secs);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.timestamp());
    }

    let formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];
    for fmt in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(dt.and_utc().timestamp());
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(input, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
        }
    }

    None
}

/// Render epoch seconds as `YYYY-MM-DD HH:MM:SS` (UTC)
pub fn format_epoch(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ncsa_with_zone() {
        // 2000-10-10 20:55:36 UTC
        assert_eq!(parse_ncsa("10/Oct/2000:13:55:36 -0700"), Some(971211336));
    }

    #[test]
    fn test_parse_ncsa_without_zone() {
        assert_eq!(parse_ncsa("10/Oct/2000:20:55:36"), Some(971211336));
    }

    #[test]
    fn test_parse_ncsa_garbage() {
        assert_eq!(parse_ncsa("yesterday-ish"), None);
    }

    #[test]
    fn test_parse_iso() {
        assert_eq!(parse_iso("2015-05-13T23:39:43.945958Z"), Some(1431560383));
        assert_eq!(parse_iso("2015-05-13T23:39:43"), Some(1431560383));
        assert_eq!(parse_iso("-"), None);
    }

    #[test]
    fn test_parse_date_arg() {
        assert_eq!(parse_date_arg("1431560383"), Some(1431560383));
        assert_eq!(parse_date_arg("2015-05-13 23:39:43"), Some(1431560383));
        assert_eq!(parse_date_arg("2015-05-13T23:39:43Z"), Some(1431560383));
        assert_eq!(parse_date_arg("1970-01-02"), Some(86400));
        assert_eq!(parse_date_arg("not a date"), None);
    }

    #[test]
    fn test_format_epoch() {
        assert_eq!(format_epoch(1431560383), "2015-05-13 23:39:43");
    }
}
