//! Dot-separated field paths.

use std::fmt;

use serde_json::{Map, Value};

use super::MappingError;

/// A dot-separated path into a record, such as `description.en_us`.
///
/// Paths are split once at construction; lookups and insertions walk the
/// segments instead of re-parsing strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    /// Parses a dot-separated path.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidPath`] for an empty path or a path with
    /// an empty segment.
    pub fn parse(raw: &str) -> Result<Self, MappingError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(MappingError::invalid_path(raw, "path is empty"));
        }
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(MappingError::invalid_path(raw, "path has an empty segment"));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Returns the path as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the individual keys of the path.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns true if `self` is a strict prefix of `other` by segment.
    #[must_use]
    pub fn is_prefix_of(&self, other: &FieldPath) -> bool {
        self.segments.len() < other.segments.len()
            && other.segments.starts_with(&self.segments)
    }

    /// Resolves the path in `record`.
    ///
    /// A key literally equal to the whole path wins over nested lookup, so
    /// flat candidate records with dotted keys still resolve. Returns `None`
    /// when any step is missing or not an object.
    #[must_use]
    pub fn lookup<'a>(&self, record: &'a Map<String, Value>) -> Option<&'a Value> {
        if let Some(value) = record.get(&self.raw) {
            return Some(value);
        }
        let (first, rest) = self.segments.split_first()?;
        rest.iter()
            .try_fold(record.get(first)?, |value, key| value.as_object()?.get(key))
    }

    /// Inserts `value` at the path, creating intermediate objects.
    pub(crate) fn insert(
        &self,
        target: &mut Map<String, Value>,
        value: Value,
    ) -> Result<(), MappingError> {
        let Some((last, parents)) = self.segments.split_last() else {
            return Err(MappingError::invalid_path(&self.raw, "path is empty"));
        };

        let mut current = target;
        for key in parents {
            let slot = current
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            current = slot.as_object_mut().ok_or_else(|| {
                MappingError::invalid_path(&self.raw, "parent segment already holds a value")
            })?;
        }

        if current.contains_key(last) {
            return Err(MappingError::invalid_path(
                &self.raw,
                "path already holds a value",
            ));
        }
        current.insert(last.clone(), value);
        Ok(())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
