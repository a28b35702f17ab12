//! Declarative field mapping from site records to canonical records.
//!
//! Each agent describes, per entity, how its site-specific candidate records
//! map onto the canonical shape. The description is data: a [`SchemaTable`]
//! is an ordered list of canonical field paths, each paired with a
//! [`FieldMapping`]. Normalizing a candidate through a table is total over the
//! table (every declared path appears in the output) and narrowing over the
//! candidate (fields the table does not name are dropped).
//!
//! # Example
//!
//! ```
//! use aggregator_core::schema::{CandidateRecord, SchemaTable};
//! use serde_json::json;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let table = SchemaTable::builder("chapter")
//!     .field("titles.en", "title")
//!     .field("posterImage", "")
//!     .external_id("asurascans", "id")
//!     .source_tag("asurascans")
//!     .build()?;
//!
//! let candidate: CandidateRecord = json!({"id": "c-1", "title": "Chapter 1", "noise": 1})
//!     .as_object()
//!     .cloned()
//!     .unwrap_or_default();
//!
//! let canonical = table.normalize(&candidate)?;
//! assert_eq!(
//!     serde_json::Value::Object(canonical),
//!     json!({
//!         "titles": {"en": "Chapter 1"},
//!         "posterImage": null,
//!         "externalIds": {"asurascans": "c-1"},
//!         "source": "asurascans"
//!     })
//! );
//! # Ok(())
//! # }
//! ```

mod error;
mod path;

pub use error::MappingError;
pub use path::FieldPath;

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::trace;

/// A loosely-typed, site-specific record produced by a site extractor.
pub type CandidateRecord = Map<String, Value>;

/// Function computing a derived field from the (optional) source value.
///
/// Wrapped in `Arc` so tables stay cheap to clone.
#[derive(Clone)]
pub struct Derivation(Arc<dyn Fn(Option<&Value>) -> Value + Send + Sync>);

impl Derivation {
    /// Wraps a derivation function.
    pub fn new(f: impl Fn(Option<&Value>) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// A derivation that ignores its input and always yields `value`.
    #[must_use]
    pub fn constant(value: Value) -> Self {
        Self::new(move |_| value.clone())
    }

    fn apply(&self, source: Option<&Value>) -> Value {
        (self.0)(source)
    }
}

impl fmt::Debug for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Derivation(..)")
    }
}

/// How one canonical field is filled.
#[derive(Debug, Clone)]
pub enum FieldMapping {
    /// Copy the value at this candidate path verbatim.
    Copy(FieldPath),
    /// The agent has no source for this field; it is emitted as null.
    Omit,
    /// Compute the value from an optional candidate path.
    Derive {
        /// Candidate path handed to the derivation, if any.
        source: Option<FieldPath>,
        /// The derivation function.
        derive: Derivation,
    },
}

impl FieldMapping {
    /// Declarative form: a candidate path to copy, or `""` for [`FieldMapping::Omit`].
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidPath`] for a malformed non-empty path.
    pub fn from_source(source: &str) -> Result<Self, MappingError> {
        if source.trim().is_empty() {
            Ok(Self::Omit)
        } else {
            FieldPath::parse(source).map(Self::Copy)
        }
    }

    fn resolve(&self, candidate: &CandidateRecord) -> Value {
        match self {
            Self::Copy(source) => source.lookup(candidate).cloned().unwrap_or(Value::Null),
            Self::Omit => Value::Null,
            Self::Derive { source, derive } => {
                derive.apply(source.as_ref().and_then(|path| path.lookup(candidate)))
            }
        }
    }
}

/// Ordered mapping from canonical field paths to [`FieldMapping`]s for one entity.
///
/// Construction validates the table: no duplicate paths and no path nested
/// under another declared path, so every output field has exactly one value.
#[derive(Debug, Clone)]
pub struct SchemaTable {
    entity: String,
    entries: Vec<(FieldPath, FieldMapping)>,
}

impl SchemaTable {
    /// Creates a table from already-built entries.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError`] for malformed, duplicate or conflicting paths.
    pub fn new<P: AsRef<str>>(
        entity: impl Into<String>,
        entries: impl IntoIterator<Item = (P, FieldMapping)>,
    ) -> Result<Self, MappingError> {
        let entity = entity.into();
        let entries = entries
            .into_iter()
            .map(|(path, mapping)| Ok((FieldPath::parse(path.as_ref())?, mapping)))
            .collect::<Result<Vec<_>, MappingError>>()?;
        validate(&entity, &entries)?;
        Ok(Self { entity, entries })
    }

    /// Creates a table from declarative `(canonical path, candidate path)` pairs,
    /// where an empty candidate path means the field is omitted.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError`] for malformed, duplicate or conflicting paths.
    pub fn from_declarations(
        entity: impl Into<String>,
        declarations: &[(&str, &str)],
    ) -> Result<Self, MappingError> {
        declarations
            .iter()
            .fold(Self::builder(entity), |builder, (path, source)| {
                builder.field(*path, source)
            })
            .build()
    }

    /// Starts a [`SchemaBuilder`].
    #[must_use]
    pub fn builder(entity: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            entity: entity.into(),
            entries: Vec::new(),
            error: None,
        }
    }

    /// Returns the entity name this table describes.
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Returns the number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table declares no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the declared canonical paths in declaration order.
    pub fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.entries.iter().map(|(path, _)| path)
    }

    /// Returns the mapping declared for `path`, if any.
    #[must_use]
    pub fn mapping(&self, path: &str) -> Option<&FieldMapping> {
        self.entries
            .iter()
            .find(|(declared, _)| declared.as_str() == path)
            .map(|(_, mapping)| mapping)
    }

    /// Returns true if the table declares `path`.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.mapping(path).is_some()
    }

    /// Normalizes a candidate record into the canonical shape.
    ///
    /// Every declared path is present in the result, materialized as nested
    /// objects for dotted paths; omitted fields and missing sources are null.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError`] only if the table's paths collide, which a
    /// validated table rules out.
    pub fn normalize(&self, candidate: &CandidateRecord) -> Result<Map<String, Value>, MappingError> {
        let mut canonical = Map::new();
        for (path, mapping) in &self.entries {
            path.insert(&mut canonical, mapping.resolve(candidate))?;
        }
        trace!(
            entity = %self.entity,
            fields = self.entries.len(),
            dropped = candidate.len().saturating_sub(self.entries.len()),
            "normalized candidate record"
        );
        Ok(canonical)
    }

    /// Normalizes a candidate and deserializes it into a typed canonical record.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Shape`] when the normalized values do not fit `T`.
    pub fn materialize<T: DeserializeOwned>(
        &self,
        candidate: &CandidateRecord,
    ) -> Result<T, MappingError> {
        let canonical = self.normalize(candidate)?;
        serde_json::from_value(Value::Object(canonical))
            .map_err(|source| MappingError::shape(&self.entity, source))
    }
}

fn validate(entity: &str, entries: &[(FieldPath, FieldMapping)]) -> Result<(), MappingError> {
    for (index, (path, _)) in entries.iter().enumerate() {
        for (other, _) in &entries[index + 1..] {
            if path == other {
                return Err(MappingError::DuplicatePath {
                    entity: entity.to_string(),
                    path: path.to_string(),
                });
            }
            let (outer, nested) = if path.is_prefix_of(other) {
                (path, other)
            } else if other.is_prefix_of(path) {
                (other, path)
            } else {
                continue;
            };
            return Err(MappingError::ConflictingPaths {
                entity: entity.to_string(),
                path: outer.to_string(),
                nested: nested.to_string(),
            });
        }
    }
    Ok(())
}

/// Fluent construction of a [`SchemaTable`].
///
/// The first malformed path is remembered and reported by [`build`](Self::build).
#[derive(Debug)]
pub struct SchemaBuilder {
    entity: String,
    entries: Vec<(String, FieldMapping)>,
    error: Option<MappingError>,
}

impl SchemaBuilder {
    fn push(mut self, path: impl Into<String>, mapping: Result<FieldMapping, MappingError>) -> Self {
        match mapping {
            Ok(mapping) => self.entries.push((path.into(), mapping)),
            Err(error) => {
                self.error.get_or_insert(error);
            }
        }
        self
    }

    /// Declarative entry: copy from `source`, or omit when `source` is `""`.
    #[must_use]
    pub fn field(self, path: impl Into<String>, source: &str) -> Self {
        let mapping = FieldMapping::from_source(source);
        self.push(path, mapping)
    }

    /// Copies the candidate value at `source`.
    #[must_use]
    pub fn copy(self, path: impl Into<String>, source: &str) -> Self {
        let mapping = FieldPath::parse(source).map(FieldMapping::Copy);
        self.push(path, mapping)
    }

    /// Declares a field the agent never supplies.
    #[must_use]
    pub fn omit(self, path: impl Into<String>) -> Self {
        self.push(path, Ok(FieldMapping::Omit))
    }

    /// Computes the field from the candidate value at `source` (`""` for none).
    #[must_use]
    pub fn derive(
        self,
        path: impl Into<String>,
        source: &str,
        f: impl Fn(Option<&Value>) -> Value + Send + Sync + 'static,
    ) -> Self {
        let source = if source.trim().is_empty() {
            Ok(None)
        } else {
            FieldPath::parse(source).map(Some)
        };
        let mapping = source.map(|source| FieldMapping::Derive {
            source,
            derive: Derivation::new(f),
        });
        self.push(path, mapping)
    }

    /// Sets the field to `value` regardless of the candidate.
    #[must_use]
    pub fn constant(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        let mapping = FieldMapping::Derive {
            source: None,
            derive: Derivation::constant(value.into()),
        };
        self.push(path, Ok(mapping))
    }

    /// Maps `externalIds.<agent_id>` from `source`.
    #[must_use]
    pub fn external_id(self, agent_id: &str, source: &str) -> Self {
        self.field(external_id_path(agent_id), source)
    }

    /// Maps `externalLinks.<agent_id>` from `source`.
    #[must_use]
    pub fn external_link(self, agent_id: &str, source: &str) -> Self {
        self.field(format!("externalLinks.{agent_id}"), source)
    }

    /// Declares the derived `source` field, always equal to `agent_id`.
    #[must_use]
    pub fn source_tag(self, agent_id: &str) -> Self {
        self.constant("source", agent_id)
    }

    /// Validates and builds the table.
    ///
    /// # Errors
    ///
    /// Returns the first malformed path, or a duplicate / conflicting path.
    pub fn build(self) -> Result<SchemaTable, MappingError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        SchemaTable::new(self.entity, self.entries)
    }
}

/// Canonical path holding an agent's own identifier for a record.
#[must_use]
pub fn external_id_path(agent_id: &str) -> String {
    format!("externalIds.{agent_id}")
}
