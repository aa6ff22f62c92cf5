//! Lenient timestamps as the backend stores them.
//!
//! Records carry whatever string the writing client produced: RFC 3339 from
//! newer writers, locale-formatted strings from older ones. `Timestamp` keeps the
//! raw text for round-tripping and derives a UTC instant when it can.

use core::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Naive forms, interpreted as UTC. Order matters: the first match wins.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    // en-US `toLocaleString()`
    "%m/%d/%Y, %I:%M:%S %p",
    // en-GB `toLocaleString()`
    "%d/%m/%Y, %H:%M:%S",
];

/// A wire timestamp: raw text plus its parsed instant, if any.
///
/// Ordering is chronological. Unparseable values sort before all parseable
/// ones, ties broken by raw text, so sorting stays total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Timestamp {
    raw: String,
    instant: Option<DateTime<Utc>>,
}

impl Timestamp {
    /// Current time, millisecond precision (what browsers write).
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let dt = dt.trunc_subsecs(3);
        Self {
            raw: dt.to_rfc3339_opts(SecondsFormat::Millis, true),
            instant: Some(dt),
        }
    }

    /// Wrap a raw backend string, parsing it if possible.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let instant = parse_instant(&raw);
        Self { raw, instant }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.instant
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.instant.map(|dt| dt.date_naive())
    }

    pub fn is_empty(&self) -> bool {
        self.raw.trim().is_empty()
    }
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    // Browsers emit U+202F / U+00A0 before the AM/PM marker.
    let normalized: String = raw
        .trim()
        .chars()
        .map(|c| if c == '\u{202f}' || c == '\u{a0}' { ' ' } else { c })
        .collect();
    if normalized.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant
            .cmp(&other.instant)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl core::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self::from_datetime(value)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(Self::parse(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_rfc3339_from_iso_string() {
        let ts = Timestamp::parse("2026-10-19T09:30:00.000Z");
        let dt = ts.instant().unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day(), dt.hour()), (2026, 10, 19, 9));
    }

    #[test]
    fn parses_en_us_locale_string_with_narrow_space() {
        let ts = Timestamp::parse("10/19/2026, 3:04:05\u{202f}PM");
        let dt = ts.instant().unwrap();
        assert_eq!((dt.month(), dt.day(), dt.hour(), dt.minute()), (10, 19, 15, 4));
        assert_eq!(ts.as_str(), "10/19/2026, 3:04:05\u{202f}PM");
    }

    #[test]
    fn parses_en_gb_locale_string() {
        let ts = Timestamp::parse("19/10/2026, 15:04:05");
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2026, 10, 19));
    }

    #[test]
    fn unparseable_sorts_before_parseable() {
        let junk = Timestamp::parse("yesterday-ish");
        let real = Timestamp::parse("2020-01-01");
        assert!(junk.instant().is_none());
        assert!(junk < real);
    }

    #[test]
    fn chronological_order_ignores_text_format() {
        let us = Timestamp::parse("1/2/2026, 10:00:00 AM");
        let iso = Timestamp::parse("2026-01-01T23:00:00Z");
        assert!(iso < us);
    }

    #[test]
    fn null_and_missing_deserialize_to_empty() {
        let ts: Timestamp = serde_json::from_str("null").unwrap();
        assert!(ts.is_empty());
        assert!(ts.instant().is_none());
    }

    #[test]
    fn now_round_trips_through_json() {
        let ts = Timestamp::now();
        let json = serde_json::to_string(&ts).unwrap();
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}
