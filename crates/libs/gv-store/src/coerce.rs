//! Per-field coercion from loosely typed JSON into typed values.
//!
//! Every helper is total: a value of the wrong shape yields `None`, never an error.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Integers, integral floats and trimmed decimal strings. Booleans are not integers.
pub(crate) fn int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().and_then(integral_f64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Like [`int`] for values that must be non-negative; also accepts the full `u64` range.
pub(crate) fn unsigned(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .and_then(integral_f64)
                .and_then(|int| u64::try_from(int).ok())
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn index(value: Option<&Value>) -> Option<u32> {
    unsigned(value).and_then(|value| u32::try_from(value).ok())
}

pub(crate) fn float(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|float| float.is_finite())
}

pub(crate) fn boolean(value: Option<&Value>) -> Option<bool> {
    value?.as_bool()
}

/// Any JSON string, untouched.
pub(crate) fn string(value: Option<&Value>) -> Option<String> {
    value?.as_str().map(str::to_string)
}

/// A JSON string, trimmed, if anything is left.
pub(crate) fn text(value: Option<&Value>) -> Option<String> {
    let trimmed = value?.as_str()?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub(crate) fn string_or_empty(value: Option<&Value>) -> String {
    string(value).unwrap_or_default()
}

pub(crate) fn timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let text = text(value)?;
    DateTime::parse_from_rfc3339(&text)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn integral_f64(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        Some(value as i64)
    } else {
        None
    }
}
