//! Defensive scalar coercion for untrusted fields.
//!
//! Every function here accepts whatever value a record happened to carry (or
//! nothing at all) and returns a typed value. Unparsable input resolves to a
//! documented default and is logged at debug level; nothing here returns an error.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::debug;

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Integer with thousands separators and whitespace stripped. GitHub's
/// abbreviated counts (`1.2k`, `3m`) are expanded. Anything else, including a
/// missing value, yields `default`.
pub fn to_int(value: Option<&Value>, default: i64) -> i64 {
    let parsed = match value {
        None | Some(Value::Null) => return default,
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|v| v.min(i64::MAX as u64) as i64))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Some(Value::String(s)) => parse_int_str(s),
        Some(_) => None,
    };
    match parsed {
        Some(v) => v,
        None => {
            debug!(?value, default, "integer coercion fell back to default");
            default
        }
    }
}

/// Non-negative count; negatives clamp to zero.
pub fn to_count(value: Option<&Value>) -> u64 {
    to_int(value, 0).max(0) as u64
}

fn parse_int_str(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '_')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(v) = cleaned.parse::<i64>() {
        return Some(v);
    }

    let lower = cleaned.to_ascii_lowercase();
    let (digits, multiplier) = match lower.chars().last() {
        Some('k') => (&lower[..lower.len() - 1], 1_000f64),
        Some('m') => (&lower[..lower.len() - 1], 1_000_000f64),
        Some('b') => (&lower[..lower.len() - 1], 1_000_000_000f64),
        _ => (lower.as_str(), 1f64),
    };
    digits
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| (f * multiplier) as i64)
}

/// Native booleans or case-insensitive `"true"` / `"false"`; otherwise `default`.
pub fn to_bool(value: Option<&Value>, default: bool) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.eq_ignore_ascii_case("true") {
                true
            } else if trimmed.eq_ignore_ascii_case("false") {
                false
            } else {
                debug!(value = %s, default, "boolean coercion fell back to default");
                default
            }
        }
        _ => default,
    }
}

/// Parses ISO-8601 with or without a trailing `Z`. On failure the current
/// processing time is returned so a single bad timestamp never sinks a record.
pub fn to_timestamp(value: Option<&Value>) -> DateTime<Utc> {
    parse_timestamp(value).unwrap_or_else(|| {
        debug!(?value, "timestamp coercion fell back to processing time");
        Utc::now()
    })
}

/// Like [`to_timestamp`] for optional fields: missing or unparsable is `None`.
pub fn to_optional_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    parse_timestamp(value)
}

pub fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => parse_timestamp_str(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        _ => None,
    }
}

fn parse_timestamp_str(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = raw.trim_end_matches(['Z', 'z']);
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}

/// Empty and whitespace-only strings are "no value", same as null.
pub fn to_optional_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn to_string_or(value: Option<&Value>, default: &str) -> String {
    to_optional_string(value).unwrap_or_else(|| default.to_string())
}

/// Ordered set of strings from a JSON array or a comma-separated string.
/// Blank entries are skipped and the first occurrence of a duplicate wins.
pub fn to_string_set(value: Option<&Value>) -> Vec<String> {
    let candidates: Vec<String> = match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| to_optional_string(Some(item)))
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    let mut out: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}
