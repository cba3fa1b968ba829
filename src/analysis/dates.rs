//! Last-updated date parsing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Date-time layouts tried after the timezone suffix is removed.
const DATETIME_FORMATS: &[&str] = &[
    // Registry format, e.g. "2024-06-01 3:45pm"
    "%Y-%m-%d %I:%M%p",
    "%Y-%m-%d %I:%M %p",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parse a registry `last_updated` value into UTC.
///
/// Accepts the registry's own `2024-06-01 3:45pm GMT` layout, RFC 3339,
/// `YYYY-MM-DD HH:MM[:SS]` and bare `YYYY-MM-DD` (midnight UTC).
/// Returns `None` when nothing matches.
pub fn parse_last_updated(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = strip_utc_suffix(raw);

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }

    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}

fn strip_utc_suffix(raw: &str) -> &str {
    for suffix in [" GMT", " UTC", "Z"] {
        if let Some(stripped) = raw.strip_suffix(suffix) {
            return stripped.trim_end();
        }
    }
    raw
}
