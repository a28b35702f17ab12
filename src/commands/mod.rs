//! CLI command handlers.

mod agents;
mod chapters;
mod item;
mod pages;
mod search;

use std::sync::Arc;

use aggregator_core::{Agent, AgentRegistry, Stage};
use anyhow::{Result, bail};
use serde::Serialize;
use url::Url;

pub use agents::run_agents_command;
pub use chapters::run_chapters_command;
pub use item::run_item_command;
pub use pages::run_pages_command;
pub use search::run_search_command;

/// Picks the agent for a single-agent stage.
///
/// An explicit id wins. Otherwise a URL input is matched against agent
/// hosts, and a bare id falls back to the highest-priority agent for the
/// stage.
fn select_agent<'r>(
    registry: &'r AgentRegistry,
    stage: Stage,
    requested: Option<&str>,
    input: &str,
) -> Result<&'r Arc<Agent>> {
    if let Some(id) = requested {
        let Some(agent) = registry.get(id) else {
            bail!(
                "Unknown agent '{id}'. Available agents: {}",
                registry.ids().join(", ")
            );
        };
        if !agent.supports(stage) {
            bail!("Agent '{id}' does not support the {stage} stage");
        }
        return Ok(agent);
    }

    let candidates = registry.for_stage(stage);
    if let Some(input_host) = host_of(input) {
        if let Some(agent) = candidates
            .iter()
            .copied()
            .find(|agent| host_of(agent.host()).as_deref() == Some(input_host.as_str()))
        {
            return Ok(agent);
        }
        bail!("No agent serves host '{input_host}'; pass --agent explicitly");
    }

    match candidates.first().copied() {
        Some(agent) => Ok(agent),
        None => bail!("No registered agent supports the {stage} stage"),
    }
}

fn host_of(value: &str) -> Option<String> {
    let url = Url::parse(value).ok()?;
    let host = url.host_str()?;
    Some(host.trim_start_matches("www.").to_ascii_lowercase())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aggregator_core::{FetchError, FetchOptions, RawFetcher, build_default_registry};
    use async_trait::async_trait;

    use super::*;

    struct NoNetwork;

    #[async_trait]
    impl RawFetcher for NoNetwork {
        async fn fetch(&self, url: &str, _options: &FetchOptions) -> Result<String, FetchError> {
            Err(FetchError::unavailable(url, "network disabled in tests"))
        }
    }

    fn registry() -> AgentRegistry {
        build_default_registry(Arc::new(NoNetwork))
    }

    #[test]
    fn test_select_agent_by_explicit_id() {
        let registry = registry();
        let agent = select_agent(&registry, Stage::ItemDetail, Some("asurascans"), "x").unwrap();
        assert_eq!(agent.id(), "asurascans");
    }

    #[test]
    fn test_select_agent_unknown_id_lists_available() {
        let registry = registry();
        let err = select_agent(&registry, Stage::ItemDetail, Some("nope"), "x").unwrap_err();
        assert!(err.to_string().contains("asurascans"));
    }

    #[test]
    fn test_select_agent_by_url_host() {
        let registry = registry();
        let agent = select_agent(
            &registry,
            Stage::SubItemListing,
            None,
            "https://www.asuracomic.net/series/tower-of-god",
        )
        .unwrap();
        assert_eq!(agent.id(), "asurascans");
    }

    #[test]
    fn test_select_agent_unknown_host_fails() {
        let registry = registry();
        let err = select_agent(
            &registry,
            Stage::LeafContent,
            None,
            "https://unknown.example/chapter/1",
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown.example"));
    }

    #[test]
    fn test_select_agent_bare_id_uses_first_for_stage() {
        let registry = registry();
        let agent = select_agent(&registry, Stage::ItemDetail, None, "tower-of-god").unwrap();
        assert_eq!(agent.id(), "asurascans");
    }

    #[test]
    fn test_select_agent_empty_registry() {
        let registry = AgentRegistry::new();
        let err = select_agent(&registry, Stage::Search, None, "tower").unwrap_err();
        assert!(err.to_string().contains("search"));
    }
}
