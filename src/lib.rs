//! Aggregator Core Library
//!
//! This library provides the core of the catalog aggregator: independent
//! agents, each bound to one external catalog site, translate that site's
//! search hits, series metadata, chapter listings and page images into one
//! normalized data model.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`fetch`] - Raw content retrieval and the per-agent rate limiter
//! - [`schema`] - Declarative field mapping from site records to canonical records
//! - [`model`] - Canonical records (lookup, item, sub-item, page)
//! - [`agent`] - Agent contract, four-stage pipeline, capabilities and registry
//! - [`agents`] - Shipped site agents and the default registry

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod agents;
pub mod fetch;
pub mod model;
pub mod schema;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use agent::{
    Agent, AgentError, AgentProfile, AgentRegistry, AgentSchemas, BuildError, Capability,
    CapabilitySet, ExtractionError, ItemRef, ParseContext, SiteExtractor, Stage,
};
pub use agents::{AgentSettings, build_default_registry, build_registry_with};
pub use fetch::{FetchError, FetchOptions, FetcherSettings, HttpFetcher, RateLimiter, RawFetcher};
pub use model::{ItemRecord, LookupRecord, PageRecord, SubItemRecord};
pub use schema::{CandidateRecord, FieldMapping, MappingError, SchemaTable};
