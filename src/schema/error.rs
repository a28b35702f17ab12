//! Error types for schema mapping.
//!
//! A well-formed schema table never produces these at normalization time;
//! they indicate a configuration defect in an agent's table or a canonical
//! shape the typed records cannot accept.

use thiserror::Error;

/// Errors raised while building a schema table or normalizing through it.
#[derive(Debug, Error)]
pub enum MappingError {
    /// A field path is empty or has an empty segment (`"a..b"`, `".a"`).
    #[error("invalid field path '{path}': {reason}")]
    InvalidPath {
        /// The rejected path.
        path: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The same canonical path is declared twice in one table.
    #[error("schema '{entity}' declares '{path}' more than once")]
    DuplicatePath {
        /// Entity the table describes.
        entity: String,
        /// The repeated path.
        path: String,
    },

    /// One canonical path is a prefix of another, so one of them would have
    /// to be both a value and a nested structure.
    #[error("schema '{entity}' maps both '{path}' and nested path '{nested}'")]
    ConflictingPaths {
        /// Entity the table describes.
        entity: String,
        /// The shorter path.
        path: String,
        /// The path nested beneath it.
        nested: String,
    },

    /// The normalized record does not fit the typed canonical record.
    #[error("normalized '{entity}' record does not fit the canonical shape: {source}")]
    Shape {
        /// Entity the table describes.
        entity: String,
        /// The deserialization failure.
        #[source]
        source: serde_json::Error,
    },
}

impl MappingError {
    /// Creates an `InvalidPath` error.
    #[must_use]
    pub fn invalid_path(path: &str, reason: &'static str) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason,
        }
    }

    /// Creates a `Shape` error.
    #[must_use]
    pub fn shape(entity: &str, source: serde_json::Error) -> Self {
        Self::Shape {
            entity: entity.to_string(),
            source,
        }
    }
}
