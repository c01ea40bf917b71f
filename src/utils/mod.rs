use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Format a processed-at stamp, e.g. "2025-11-12 18:04:05.123456+00:00"
pub fn processed_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d %H:%M:%S%.6f%:z").to_string()
}

/// Stamp for the current instant
pub fn processed_now() -> String {
    processed_timestamp(Utc::now())
}

/// Parse a game date as returned by the stats API.
///
/// Accepts "2024-04-14", "2024-04-14T00:00:00" and the older "APR 14, 2024".
pub fn parse_game_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    // chrono month names are case-insensitive
    NaiveDate::parse_from_str(raw, "%b %d, %Y").ok()
}

/// ISO calendar date, "YYYY-MM-DD"
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Split "Last, First" into (first, last). Single names land in `last`.
pub fn split_last_comma_first(display: &str) -> (String, String) {
    match display.split_once(',') {
        Some((last, first)) => (first.trim().to_string(), last.trim().to_string()),
        None => (String::new(), display.trim().to_string()),
    }
}
