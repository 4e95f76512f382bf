use std::sync::Arc;

use super::Agent;
use crate::error::ServerError;

/// Ordered set of agents with a default owner for every task.
#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: Vec<Arc<dyn Agent>>,
    default_id: Option<String>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `agent`, replacing a registered agent with the same id in place.
    pub fn register(&mut self, agent: Arc<dyn Agent>) -> &mut Self {
        tracing::info!(agent = agent.id(), "registered agent");
        match self.agents.iter_mut().find(|a| a.id() == agent.id()) {
            Some(slot) => *slot = agent,
            None => self.agents.push(agent),
        }
        self
    }

    pub fn with(mut self, agent: Arc<dyn Agent>) -> Self {
        self.register(agent);
        self
    }

    /// Chooses the default agent. Without one the first registered agent is used.
    pub fn set_default(&mut self, agent_id: &str) -> Result<(), ServerError> {
        if self.get(agent_id).is_none() {
            return Err(ServerError::AgentNotFound(agent_id.to_string()));
        }
        self.default_id = Some(agent_id.to_string());
        Ok(())
    }

    pub fn get(&self, agent_id: &str) -> Option<Arc<dyn Agent>> {
        self.agents.iter().find(|a| a.id() == agent_id).cloned()
    }

    pub fn default_agent(&self) -> Option<Arc<dyn Agent>> {
        match &self.default_id {
            Some(id) => self.get(id),
            None => self.agents.first().cloned(),
        }
    }

    /// Agent owning a new or continued task.
    pub fn route(&self) -> Result<Arc<dyn Agent>, ServerError> {
        self.default_agent().ok_or(ServerError::NoAgentRegistered)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.agents.iter().map(|a| a.id())
    }
}
