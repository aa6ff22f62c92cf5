//! Human-facing formatting of names, dates and times.

use chrono::{DateTime, Utc};

use karatbook_core::Timestamp;

/// `"gOLD"` -> `"Gold"`.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// `"Monday, 19 Oct 2026"`. Unparseable timestamps print raw.
pub fn format_long_date(at: &Timestamp) -> String {
    match at.instant() {
        Some(dt) => long_date(dt),
        None => at.as_str().to_string(),
    }
}

/// `"15:04:05"` (24-hour). Unparseable timestamps print raw.
pub fn format_time(at: &Timestamp) -> String {
    match at.instant() {
        Some(dt) => dt.format("%H:%M:%S").to_string(),
        None => at.as_str().to_string(),
    }
}

fn long_date(dt: DateTime<Utc>) -> String {
    dt.format("%A, %-d %b %Y").to_string()
}
