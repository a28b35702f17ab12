//! Shared helpers for site extractors: text cleanup, URL joining and
//! selector plumbing.

use scraper::{ElementRef, Selector};
use serde_json::Value;
use url::Url;

/// Declares a lazily parsed CSS selector.
macro_rules! selector {
    ($name:ident, $css:expr) => {
        static $name: std::sync::LazyLock<scraper::Selector> = std::sync::LazyLock::new(|| {
            scraper::Selector::parse($css)
                .unwrap_or_else(|e| panic!("invalid static selector '{}': {e}", $css))
        });
    };
}

pub(crate) use selector;

/// Collapses runs of whitespace and trims.
#[must_use]
pub fn clean_str(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cleaned text content of an element.
#[must_use]
pub fn element_text(element: ElementRef<'_>) -> String {
    clean_str(&element.text().collect::<String>())
}

/// Cleaned text of the first match of `selector` under `scope`, if non-empty.
#[must_use]
pub fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// Trimmed attribute of the first match of `selector` under `scope`, if non-empty.
#[must_use]
pub fn first_attr(scope: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    scope
        .select(selector)
        .next()
        .and_then(|element| element.value().attr(attr))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Resolves a possibly relative link against `base`.
///
/// Absolute `http(s)` links are kept; `//host/...` becomes `https://host/...`.
#[must_use]
pub fn absolutize_url(value: &str, base: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some(value.to_string());
    }
    if value.starts_with("//") {
        return Some(format!("https:{value}"));
    }
    Url::parse(base)
        .and_then(|base| base.join(value))
        .ok()
        .map(|url| url.to_string())
}

/// Optional text as a JSON value (`null` when absent).
#[must_use]
pub fn text_value(value: Option<String>) -> Value {
    value.map_or(Value::Null, Value::String)
}
