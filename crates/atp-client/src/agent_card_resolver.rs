use atp_types::AgentCard;

use crate::error::ClientError;

/// Resolves an [`AgentCard`] from `{base_url}/.well-known/agent.json`.
pub struct AgentCardResolver {
    client: reqwest::Client,
}

impl AgentCardResolver {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Card of the server's default agent.
    pub async fn resolve(&self, base_url: &str) -> Result<AgentCard, ClientError> {
        self.fetch(base_url, None).await
    }

    /// Card of a specific agent hosted by the server.
    pub async fn resolve_agent(
        &self,
        base_url: &str,
        agent_id: &str,
    ) -> Result<AgentCard, ClientError> {
        self.fetch(base_url, Some(agent_id)).await
    }

    async fn fetch(&self, base_url: &str, agent_id: Option<&str>) -> Result<AgentCard, ClientError> {
        let url = format!("{}/.well-known/agent.json", base_url.trim_end_matches('/'));
        let mut request = self.client.get(&url);
        if let Some(id) = agent_id {
            request = request.query(&[("agent_id", id)]);
        }
        let response = request.send().await?.error_for_status()?;
        let card: AgentCard = response.json().await?;
        tracing::debug!(agent = %card.name, url = %card.url, "resolved agent card");
        Ok(card)
    }
}

impl Default for AgentCardResolver {
    fn default() -> Self {
        Self::new()
    }
}
