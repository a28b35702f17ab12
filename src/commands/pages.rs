//! Pages command handler: page images of one chapter.

use aggregator_core::{AgentRegistry, ItemRef, Stage};
use anyhow::Result;

use super::{print_json, select_agent};

pub async fn run_pages_command(
    registry: &AgentRegistry,
    chapter: &str,
    agent: Option<&str>,
) -> Result<()> {
    let agent = select_agent(registry, Stage::LeafContent, agent, chapter)?;
    let pages = agent.pages(&ItemRef::parse(chapter)).await?;
    print_json(&pages)
}
