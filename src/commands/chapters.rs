//! Chapters command handler: sub-item listing for a series.

use aggregator_core::{AgentRegistry, ItemRef, Stage};
use anyhow::{Result, bail};

use super::{print_json, select_agent};

pub async fn run_chapters_command(
    registry: &AgentRegistry,
    id: &str,
    agent: Option<&str>,
    lang: Option<&str>,
    offset: u32,
    page: u32,
) -> Result<()> {
    let agent = select_agent(registry, Stage::SubItemListing, agent, id)?;
    let Some(chapters) = agent
        .sub_items(&ItemRef::parse(id), offset, page, lang)
        .await
    else {
        bail!("Chapter listing unavailable from agent '{}'", agent.id());
    };
    print_json(&chapters)
}
