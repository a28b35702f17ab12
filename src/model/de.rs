//! Lenient deserializers for loosely-typed extracted values.
//!
//! Site extractors hand over whatever the markup yielded: trimmed or not,
//! numbers as text, a single string where a list is expected. These helpers
//! coerce such values at the typed-record boundary instead of making every
//! extractor pre-clean its output.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = r"\d+(?:\.\d+)?";
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
});

/// Extracts the first number embedded in `text` (`"Chapter 12.5"` → `12.5`).
#[must_use]
pub fn first_number(text: &str) -> Option<f64> {
    NUMBER_RE
        .find(text)
        .and_then(|found| found.as_str().parse::<f64>().ok())
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Optional text: trimmed, empty as `None`, numbers and booleans rendered.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Array(_) | Value::Object(_) => Err(de::Error::custom(
            "expected a text value, found a list or object",
        )),
        other => Ok(scalar_to_string(other)),
    }
}

/// Required text; missing, null or blank is rejected.
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    opt_string(deserializer)?.ok_or_else(|| de::Error::custom("expected a non-empty text value"))
}

/// List of text: accepts a list, a single value, or null.
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Array(items) => Ok(items.into_iter().filter_map(scalar_to_string).collect()),
        Value::Object(_) => Err(de::Error::custom("expected a list, found an object")),
        scalar => Ok(scalar_to_string(scalar).into_iter().collect()),
    }
}

/// Optional number: accepts a number or text containing one.
pub fn opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        Value::Number(number) => Ok(number.as_f64()),
        Value::String(text) => Ok(first_number(&text)),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
            Err(de::Error::custom("expected a number"))
        }
    }
}

/// Optional non-negative count, such as a year or a page total.
pub fn opt_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_number(deserializer)?.and_then(to_count))
}

/// Non-negative count defaulting to 0 when absent.
pub fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_count(deserializer)?.unwrap_or_default())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_count(number: f64) -> Option<u32> {
    (number.is_finite() && number >= 0.0 && number <= f64::from(u32::MAX))
        .then(|| number.trunc() as u32)
}

/// Keyed text (locale or agent id → value); null entries are dropped.
pub fn string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(BTreeMap::new()),
        Value::Object(entries) => Ok(entries
            .into_iter()
            .filter_map(|(key, value)| scalar_to_string(value).map(|text| (key, text)))
            .collect()),
        _ => Err(de::Error::custom("expected an object keyed by locale or agent id")),
    }
}
