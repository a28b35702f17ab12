//! Search command handler: query one or every search-capable agent.

use aggregator_core::{AgentRegistry, LookupRecord, Stage};
use anyhow::{Result, bail};
use tracing::{info, warn};

use super::{print_json, select_agent};

pub async fn run_search_command(
    registry: &AgentRegistry,
    query: &str,
    agent: Option<&str>,
    offset: u32,
    page: u32,
) -> Result<()> {
    if query.trim().is_empty() {
        bail!("Search query must not be empty");
    }

    if agent.is_some() {
        let agent = select_agent(registry, Stage::Search, agent, query)?;
        let records = agent.search(query, offset, page).await?;
        info!(agent = %agent.id(), results = records.len(), "search complete");
        return print_json(&records);
    }

    let agents = registry.for_stage(Stage::Search);
    if agents.is_empty() {
        bail!("No registered agent supports the {} stage", Stage::Search);
    }

    let mut records: Vec<LookupRecord> = Vec::new();
    let mut failures = 0usize;
    for agent in &agents {
        match agent.search(query, offset, page).await {
            Ok(found) => {
                info!(agent = %agent.id(), results = found.len(), "search complete");
                records.extend(found);
            }
            Err(error) => {
                failures += 1;
                warn!(agent = %agent.id(), error = %error, "search failed; continuing with remaining agents");
            }
        }
    }

    if failures == agents.len() {
        bail!("Search failed on every agent");
    }
    print_json(&records)
}
