//! Item command handler: series metadata by id or URL.

use aggregator_core::{AgentRegistry, ItemRef, Stage};
use anyhow::Result;

use super::{print_json, select_agent};

pub async fn run_item_command(registry: &AgentRegistry, id: &str, agent: Option<&str>) -> Result<()> {
    let agent = select_agent(registry, Stage::ItemDetail, agent, id)?;
    let record = agent.item(&ItemRef::parse(id)).await?;
    print_json(&record)
}
