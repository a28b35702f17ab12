//! Shipped agents and the default registry.
//!
//! # Agents
//!
//! - [`asurascans`] - Asura Scans (`asuracomic.net`): search, series metadata, chapters, pages

pub mod asurascans;
mod utils;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::agent::AgentRegistry;
use crate::fetch::{LimiterError, RateLimiter, RawFetcher};

/// Overrides applied to every agent built for a registry.
///
/// `None` keeps each agent's own default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentSettings {
    /// Maximum simultaneous requests per agent.
    pub max_concurrent: Option<usize>,
    /// Minimum spacing between request starts per agent.
    pub min_time: Option<Duration>,
}

impl AgentSettings {
    /// Builds a limiter from the overrides, falling back to the agent's defaults.
    ///
    /// # Errors
    ///
    /// Returns [`LimiterError`] if the effective concurrency is zero.
    pub fn limiter(
        &self,
        default_max_concurrent: usize,
        default_min_time: Duration,
    ) -> Result<RateLimiter, LimiterError> {
        RateLimiter::new(
            self.max_concurrent.unwrap_or(default_max_concurrent),
            self.min_time.unwrap_or(default_min_time),
        )
    }
}

/// Builds the registry of shipped agents with their default settings.
#[must_use]
pub fn build_default_registry(fetcher: Arc<dyn RawFetcher>) -> AgentRegistry {
    build_registry_with(fetcher, &AgentSettings::default())
}

/// Builds the registry of shipped agents, applying `settings` to each.
///
/// An agent that fails to build is logged and skipped.
#[must_use]
pub fn build_registry_with(fetcher: Arc<dyn RawFetcher>, settings: &AgentSettings) -> AgentRegistry {
    let mut registry = AgentRegistry::new();

    match asurascans::agent(Arc::clone(&fetcher), settings) {
        Ok(agent) => registry.register(agent),
        Err(error) => warn!(
            error = %error,
            "Asurascans agent unavailable; continuing with remaining agents"
        ),
    }

    info!(agents = registry.len(), "agent registry ready");
    registry
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::agent::{Capability, Stage};
    use crate::test_support::ScriptedFetcher;

    #[test]
    fn test_settings_default_keeps_agent_limits() {
        let limiter = AgentSettings::default()
            .limiter(1, Duration::from_millis(1000))
            .unwrap();
        assert_eq!(limiter.max_concurrent(), 1);
        assert_eq!(limiter.min_time(), Duration::from_millis(1000));
    }

    #[test]
    fn test_settings_override_limits() {
        let settings = AgentSettings {
            max_concurrent: Some(4),
            min_time: Some(Duration::from_millis(250)),
        };
        let limiter = settings.limiter(1, Duration::from_millis(1000)).unwrap();
        assert_eq!(limiter.max_concurrent(), 4);
        assert_eq!(limiter.min_time(), Duration::from_millis(250));
    }

    #[test]
    fn test_default_registry_contains_asurascans() {
        let registry = build_default_registry(Arc::new(ScriptedFetcher::new()));
        assert_eq!(registry.ids(), ["asurascans"]);
        assert_eq!(
            registry.with_capability(Capability::ChapterFetch).len(),
            1
        );
        assert_eq!(registry.for_stage(Stage::Search)[0].id(), "asurascans");
    }

    #[test]
    fn test_registry_skips_agent_with_invalid_limits() {
        let settings = AgentSettings {
            max_concurrent: Some(0),
            min_time: None,
        };
        let registry = build_registry_with(Arc::new(ScriptedFetcher::new()), &settings);
        assert!(registry.is_empty());
    }
}
