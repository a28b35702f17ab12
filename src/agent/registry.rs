//! Registry of agents, selectable by id, capability and stage.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{Agent, Capability, Stage};

/// Ordered collection of agents.
///
/// Agents keep registration order; selections by capability or stage are
/// sorted by ascending `priority` (ties keep registration order), cover
/// sources by ascending `cover_priority`.
pub struct AgentRegistry {
    agents: Vec<Arc<Agent>>,
}

impl AgentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { agents: Vec::new() }
    }

    /// Adds an agent. An agent with the same id is replaced in place.
    pub fn register(&mut self, agent: Agent) {
        let agent = Arc::new(agent);
        if let Some(slot) = self.agents.iter_mut().find(|known| known.id() == agent.id()) {
            warn!(agent = %agent.id(), "replacing already registered agent");
            *slot = agent;
        } else {
            debug!(
                agent = %agent.id(),
                capabilities = %agent.capabilities(),
                priority = agent.profile().priority,
                "registered agent"
            );
            self.agents.push(agent);
        }
    }

    /// Returns the agent with `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<Agent>> {
        self.agents.iter().find(|agent| agent.id() == id)
    }

    /// Agents declaring `capability`, by ascending priority.
    #[must_use]
    pub fn with_capability(&self, capability: Capability) -> Vec<&Arc<Agent>> {
        self.sorted_by(
            |agent| agent.capabilities().contains(capability),
            |agent| agent.profile().priority,
        )
    }

    /// Agents whose capabilities enable `stage`, by ascending priority.
    #[must_use]
    pub fn for_stage(&self, stage: Stage) -> Vec<&Arc<Agent>> {
        self.with_capability(stage.capability())
    }

    /// Agents able to supply item metadata (and so cover images), by
    /// ascending cover priority.
    #[must_use]
    pub fn cover_sources(&self) -> Vec<&Arc<Agent>> {
        self.sorted_by(
            |agent| agent.supports(Stage::ItemDetail),
            |agent| agent.profile().cover_priority,
        )
    }

    /// Iterates agents in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Agent>> {
        self.agents.iter()
    }

    /// Returns the registered agent ids in registration order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.agents.iter().map(|agent| agent.id()).collect()
    }

    /// Returns the number of registered agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Returns true if no agents are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    fn sorted_by(
        &self,
        keep: impl Fn(&Agent) -> bool,
        key: impl Fn(&Agent) -> u32,
    ) -> Vec<&Arc<Agent>> {
        let mut selected: Vec<&Arc<Agent>> =
            self.agents.iter().filter(|agent| keep(agent)).collect();
        // sort_by_key is stable, so ties keep registration order
        selected.sort_by_key(|agent| key(agent));
        selected
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.ids())
            .finish()
    }
}
