//! Agents command handler: list registered agents.

use aggregator_core::{AgentProfile, AgentRegistry};
use anyhow::Result;
use serde::Serialize;

use super::print_json;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AgentSummary<'a> {
    #[serde(flatten)]
    profile: &'a AgentProfile,
    max_concurrent: usize,
    min_time_ms: u64,
}

pub fn run_agents_command(registry: &AgentRegistry) -> Result<()> {
    let summaries: Vec<AgentSummary<'_>> = registry
        .iter()
        .map(|agent| AgentSummary {
            profile: agent.profile(),
            max_concurrent: agent.limiter().max_concurrent(),
            min_time_ms: u64::try_from(agent.limiter().min_time().as_millis()).unwrap_or(u64::MAX),
        })
        .collect();
    print_json(&summaries)
}
