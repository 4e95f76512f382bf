use crate::agent::AgentProfile;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_AGENT_ID: &str = "research-assistant";
const DEFAULT_AGENT_NAME: &str = "Research Assistant";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Which built-in profile the served agent uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    Reasoning,
    Concise,
}

impl ProfileKind {
    pub fn profile(&self) -> AgentProfile {
        match self {
            ProfileKind::Reasoning => AgentProfile::reasoning(),
            ProfileKind::Concise => AgentProfile::concise(),
        }
    }
}

/// Settings for the `atp-server` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub agent_id: String,
    pub agent_name: String,
    pub profile: ProfileKind,
    /// URL advertised in the agent card. Defaults to `http://{host}:{port}`.
    pub public_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub model: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("ATP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match var("ATP_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "ATP_PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };
        let profile = match var("ATP_AGENT_PROFILE").as_deref().map(str::trim) {
            None | Some("reasoning") => ProfileKind::Reasoning,
            Some("concise") => ProfileKind::Concise,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "ATP_AGENT_PROFILE",
                    value: other.to_string(),
                })
            }
        };
        let public_url = var("ATP_PUBLIC_URL").unwrap_or_else(|| format!("http://{host}:{port}"));

        Ok(Self {
            agent_id: var("ATP_AGENT_ID").unwrap_or_else(|| DEFAULT_AGENT_ID.to_string()),
            agent_name: var("ATP_AGENT_NAME").unwrap_or_else(|| DEFAULT_AGENT_NAME.to_string()),
            profile,
            public_url,
            openai_api_key: var("OPENAI_API_KEY"),
            openai_base_url: var("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            model: var("ATP_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            host,
            port,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
