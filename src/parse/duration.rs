//! Free-form execution-duration parsing into fractional minutes.
//!
//! Producers report durations as raw numbers (already minutes), numeric
//! strings, or loosely written spans such as `"1h 30m"`, `"2 horas 5 min"`
//! or `"45s"`.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// Hours, minutes and seconds components, each optional, in that order.
///
/// The match is anchored at the start of the input; trailing text after the
/// last recognised component is ignored. Letters glued to a unit land in the
/// `*t` tails, and a non-empty tail rejects the input (`500ms`, `2 months`).
const DURATION_PATTERN: &str = r"(?ix)
    ^\s*
    (?: (?P<h>\d+(?:[.,]\d+)?) \s* h(?:ours?|oras?|rs?)? (?P<ht>\p{L}*) )?
    \s*
    (?: (?P<m>\d+(?:[.,]\d+)?) \s* m(?:in(?:ute|uto)?s?)? (?P<mt>\p{L}*) )?
    \s*
    (?: (?P<s>\d+(?:[.,]\d+)?) \s* s(?:ec(?:ond)?s?|egundos?)? (?P<st>\p{L}*) )?
";

const UNIT_TAILS: [&str; 3] = ["ht", "mt", "st"];

fn duration_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DURATION_PATTERN).ok()).as_ref()
}

/// Parse a stored duration value into minutes.
///
/// `null`, booleans, arrays and objects yield `None`. Numbers are taken as
/// minutes unchanged when finite.
#[must_use]
pub fn parse_duration_minutes(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_duration_str(s),
        _ => None,
    }
}

/// Parse a duration string into minutes.
#[must_use]
pub fn parse_duration_str(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(plain) = trimmed.parse::<f64>() {
        return plain.is_finite().then_some(plain);
    }

    let caps = duration_regex()?.captures(trimmed)?;
    if UNIT_TAILS
        .iter()
        .any(|tail| caps.name(tail).is_some_and(|m| !m.as_str().is_empty()))
    {
        return None;
    }
    let component = |name: &str| caps.name(name).and_then(|m| parse_decimal(m.as_str()));

    let hours = component("h");
    let minutes = component("m");
    let seconds = component("s");
    if hours.is_none() && minutes.is_none() && seconds.is_none() {
        return None;
    }

    let total = hours.unwrap_or(0.0).mul_add(
        60.0,
        minutes.unwrap_or(0.0) + seconds.unwrap_or(0.0) / 60.0,
    );
    total.is_finite().then_some(total)
}

/// Accept both `1.5` and the comma decimal separator (`1,5`).
fn parse_decimal(raw: &str) -> Option<f64> {
    raw.replace(',', ".").parse::<f64>().ok()
}
