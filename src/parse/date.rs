//! Best-effort instant parsing for heterogeneous document timestamps.
//!
//! Accepted shapes, tried in this order:
//! 1. Extended-JSON native dates: `{"$date": "..."}`, `{"$date": 1710498600000}`
//!    or `{"$date": {"$numberLong": "1710498600000"}}`.
//! 2. Finite epoch milliseconds.
//! 3. ISO-like strings (RFC 3339, RFC 2822, `YYYY-MM-DD[ HH:MM[:SS]]`).
//! 4. Day-first `DD/MM/YYYY` or `DD-MM-YYYY`, optionally followed by
//!    `HH[:MM[:SS]]` after whitespace or a literal `T`.
//!
//! Day-first is deliberate: stored documents were written by producers that
//! use the European ordering, so `03/04/2024` is the 3rd of April. US-style
//! month-first input is misread by this rule and is not detected.
//!
//! Strings without an explicit offset are interpreted in the supplied time
//! zone; date-only ISO strings are UTC midnight.

use std::sync::OnceLock;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;
use serde_json::Value;

/// Largest magnitude of epoch milliseconds accepted (±100,000,000 days).
const MAX_EPOCH_MILLIS: f64 = 8.64e15;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M%#z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DAY_FIRST_PATTERN: &str = r"(?x)
    ^(?P<d>\d{1,2}) (?P<s1>[/-]) (?P<mo>\d{1,2}) (?P<s2>[/-]) (?P<y>\d{4})
    (?: (?:\s+|T) (?P<time>\S+) )?
    \s*$";

const TIME_PATTERN: &str = r"^(?P<h>\d{1,2})(?::(?P<mi>\d{1,2})(?::(?P<s>\d{1,2}))?)?$";

fn day_first_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DAY_FIRST_PATTERN).ok()).as_ref()
}

fn time_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TIME_PATTERN).ok()).as_ref()
}

/// Parse a stored value into an instant, reading offset-less input as
/// process-local time.
#[must_use]
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    parse_date_in(value, &Local)
}

/// Parse a stored value into an instant, reading offset-less input in `tz`.
#[must_use]
pub fn parse_date_in<Tz: TimeZone>(value: &Value, tz: &Tz) -> Option<DateTime<Utc>> {
    match value {
        Value::Object(map) => map.get("$date").and_then(|inner| parse_native(inner, tz)),
        Value::Number(n) => from_epoch_millis(n.as_f64()?),
        Value::String(s) => parse_date_str_in(s, tz),
        _ => None,
    }
}

/// Parse a date string, reading offset-less input in `tz`.
#[must_use]
pub fn parse_date_str_in<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    parse_iso_like(trimmed, tz).or_else(|| parse_day_first(trimmed, tz))
}

fn parse_native<Tz: TimeZone>(inner: &Value, tz: &Tz) -> Option<DateTime<Utc>> {
    match inner {
        Value::Object(map) => map
            .get("$numberLong")
            .and_then(Value::as_str)
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::String(_) | Value::Number(_) => parse_date_in(inner, tz),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn from_epoch_millis(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() || ms.abs() > MAX_EPOCH_MILLIS {
        return None;
    }
    Utc.timestamp_millis_opt(ms.trunc() as i64).single()
}

fn parse_iso_like<Tz: TimeZone>(s: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return resolve_local(&naive, tz);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN).and_utc());
    }
    None
}

fn parse_day_first<Tz: TimeZone>(s: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let caps = day_first_regex()?.captures(s)?;
    if caps.name("s1")?.as_str() != caps.name("s2")?.as_str() {
        return None;
    }

    let day: u32 = caps.name("d")?.as_str().parse().ok()?;
    let month: u32 = caps.name("mo")?.as_str().parse().ok()?;
    let year: i32 = caps.name("y")?.as_str().parse().ok()?;
    if day == 0 || month == 0 {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let time = match caps.name("time") {
        Some(segment) => parse_time_segment(segment.as_str())?,
        None => NaiveTime::MIN,
    };

    resolve_local(&date.and_time(time), tz)
}

fn parse_time_segment(segment: &str) -> Option<NaiveTime> {
    let caps = time_regex()?.captures(segment)?;
    let field = |name: &str| -> Option<u32> {
        caps.name(name)
            .map_or(Some(0), |m| m.as_str().parse::<u32>().ok())
    };
    NaiveTime::from_hms_opt(field("h")?, field("mi")?, field("s")?)
}

/// Map a wall-clock time in `tz` to an instant. Ambiguous (DST fold) times
/// take the earlier instant; times inside a DST gap do not exist and yield
/// `None`.
fn resolve_local<Tz: TimeZone>(naive: &NaiveDateTime, tz: &Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
