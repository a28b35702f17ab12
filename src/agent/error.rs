//! Error types for agent stages.
//!
//! [`AgentError`] is what callers see: the underlying fetch, extraction or
//! mapping failure, tagged with the agent, stage and URL involved.

use thiserror::Error;

use super::Stage;
use crate::fetch::{FetchError, LimiterError};
use crate::schema::MappingError;

/// Raw content could not be turned into candidate records.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// A field the extractor needs was not found in the content.
    #[error("missing field '{field}'")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },

    /// The content does not have the structure the extractor expects.
    #[error("unexpected content shape: {reason}")]
    UnexpectedShape {
        /// What was wrong.
        reason: String,
    },

    /// A record's schema declares `externalIds.<agent>` but the record has none.
    #[error("{entity} record has no external id for agent '{agent}'")]
    MissingExternalId {
        /// The agent whose id is missing.
        agent: String,
        /// Entity the record belongs to.
        entity: String,
    },
}

impl ExtractionError {
    /// Creates a `MissingField` error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates an `UnexpectedShape` error.
    pub fn unexpected_shape(reason: impl Into<String>) -> Self {
        Self::UnexpectedShape {
            reason: reason.into(),
        }
    }
}

/// A stage of an agent failed.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Retrieval of the raw content failed.
    #[error("[{agent}] {stage} fetch failed for {url}: {source}")]
    Fetch {
        /// Agent id.
        agent: String,
        /// Stage that failed.
        stage: Stage,
        /// URL being fetched.
        url: String,
        /// The underlying fetch error.
        #[source]
        source: FetchError,
    },

    /// The site extractor rejected the content.
    #[error("[{agent}] {stage} extraction failed for {url}: {source}")]
    Extraction {
        /// Agent id.
        agent: String,
        /// Stage that failed.
        stage: Stage,
        /// URL whose content was parsed.
        url: String,
        /// The underlying extraction error.
        #[source]
        source: ExtractionError,
    },

    /// A candidate record could not be normalized into a canonical record.
    #[error("[{agent}] {stage} mapping failed for {url}: {source}")]
    Mapping {
        /// Agent id.
        agent: String,
        /// Stage that failed.
        stage: Stage,
        /// URL whose content was parsed.
        url: String,
        /// The underlying mapping error.
        #[source]
        source: MappingError,
    },
}

impl AgentError {
    /// Creates a `Fetch` error.
    pub fn fetch(agent: &str, stage: Stage, url: &str, source: FetchError) -> Self {
        Self::Fetch {
            agent: agent.to_string(),
            stage,
            url: url.to_string(),
            source,
        }
    }

    /// Creates an `Extraction` error.
    pub fn extraction(agent: &str, stage: Stage, url: &str, source: ExtractionError) -> Self {
        Self::Extraction {
            agent: agent.to_string(),
            stage,
            url: url.to_string(),
            source,
        }
    }

    /// Creates a `Mapping` error.
    pub fn mapping(agent: &str, stage: Stage, url: &str, source: MappingError) -> Self {
        Self::Mapping {
            agent: agent.to_string(),
            stage,
            url: url.to_string(),
            source,
        }
    }

    /// Returns the id of the agent that failed.
    #[must_use]
    pub fn agent(&self) -> &str {
        match self {
            Self::Fetch { agent, .. }
            | Self::Extraction { agent, .. }
            | Self::Mapping { agent, .. } => agent,
        }
    }

    /// Returns the stage that failed.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Fetch { stage, .. }
            | Self::Extraction { stage, .. }
            | Self::Mapping { stage, .. } => *stage,
        }
    }

    /// Returns the URL involved in the failure.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Fetch { url, .. } | Self::Extraction { url, .. } | Self::Mapping { url, .. } => {
                url
            }
        }
    }
}

/// An agent could not be assembled.
#[derive(Debug, Error)]
pub enum BuildError {
    /// One of the agent's schema tables is malformed.
    #[error("agent '{agent}' has an invalid schema table: {source}")]
    Schema {
        /// Agent id.
        agent: String,
        /// The table defect.
        #[source]
        source: MappingError,
    },

    /// The agent's rate limit settings are invalid.
    #[error("agent '{agent}' has an invalid rate limit: {source}")]
    Limiter {
        /// Agent id.
        agent: String,
        /// The limiter configuration error.
        #[source]
        source: LimiterError,
    },
}

impl BuildError {
    /// Creates a `Schema` error.
    pub fn schema(agent: &str, source: MappingError) -> Self {
        Self::Schema {
            agent: agent.to_string(),
            source,
        }
    }

    /// Creates a `Limiter` error.
    pub fn limiter(agent: &str, source: LimiterError) -> Self {
        Self::Limiter {
            agent: agent.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_error_names_agent() {
        let err = BuildError::limiter("asurascans", LimiterError::InvalidConcurrency { value: 0 });
        let msg = err.to_string();
        assert!(msg.contains("asurascans"));
        assert!(msg.contains("rate limit"));
    }

    #[test]
    fn test_agent_error_carries_context() {
        let err = AgentError::fetch(
            "asurascans",
            Stage::Search,
            "https://host/series?name=x",
            FetchError::http_status("https://host/series?name=x", 503),
        );
        assert_eq!(err.agent(), "asurascans");
        assert_eq!(err.stage(), Stage::Search);
        assert_eq!(err.url(), "https://host/series?name=x");

        let msg = err.to_string();
        assert!(msg.contains("[asurascans]"));
        assert!(msg.contains("search"));
        assert!(msg.contains("503"));
    }

    #[test]
    fn test_agent_error_source_is_underlying_error() {
        use std::error::Error as _;

        let err = AgentError::extraction(
            "asurascans",
            Stage::LeafContent,
            "https://host/chapter/1",
            ExtractionError::missing_field("img"),
        );
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("missing field 'img'"));
    }

    #[test]
    fn test_missing_external_id_message() {
        let err = ExtractionError::MissingExternalId {
            agent: "asurascans".to_string(),
            entity: "manga".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "manga record has no external id for agent 'asurascans'"
        );
    }
}
