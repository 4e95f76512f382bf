//! Text generation capability used by agents.
//!
//! A [`Generator`] turns a list of role-tagged turns into a reply string.
//! [`OpenAiGenerator`] talks to an OpenAI-compatible `/chat/completions`
//! endpoint; [`MockGenerator`] and [`StaticGenerator`] work offline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
}

/// One entry of a generation prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(TurnRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 500,
        }
    }
}

/// Generation error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub message: String,
}

impl GenerationError {
    pub fn new(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::InvalidRequest, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Unknown, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    /// Network issues, timeouts
    Network,
    /// Rate limited (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Authentication failed (401, 403)
    Auth,
    /// Bad request (400)
    InvalidRequest,
    Unknown,
}

impl GenerationErrorKind {
    /// Agents never retry; this only feeds logs.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }
}

/// "Given role-tagged turns, produce a reply string."
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        turns: &[Turn],
        options: &GenerationOptions,
    ) -> Result<String, GenerationError>;

    fn model_id(&self) -> &str;
}

/// Logging wrapper for generators
pub struct LoggingGenerator {
    inner: Arc<dyn Generator>,
    model_id: String,
}

impl LoggingGenerator {
    pub fn new(inner: Arc<dyn Generator>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl Generator for LoggingGenerator {
    async fn generate(
        &self,
        turns: &[Turn],
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        let start = std::time::Instant::now();
        let result = self.inner.generate(turns, options).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    turns = turns.len(),
                    reply_chars = reply.chars().count(),
                    "generation completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    transient = e.kind.is_transient(),
                    "generation failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

const MOCK_ECHO_CHARS: usize = 100;

/// Offline stand-in: echoes the last non-empty turn.
#[derive(Debug, Default, Clone)]
pub struct MockGenerator;

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(
        &self,
        turns: &[Turn],
        _options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        let last = turns
            .iter()
            .rev()
            .map(|t| t.content.as_str())
            .find(|c| !c.is_empty());

        Ok(match last {
            Some(content) => {
                let head: String = content.chars().take(MOCK_ECHO_CHARS).collect();
                format!("This is a mock response for demonstration purposes. I received: {head}...")
            }
            None => "This is a default mock response for demonstration purposes.".to_string(),
        })
    }

    fn model_id(&self) -> &str {
        "mock"
    }
}

/// Always answers with the same reply.
#[derive(Debug, Clone)]
pub struct StaticGenerator {
    reply: String,
}

impl StaticGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl Generator for StaticGenerator {
    async fn generate(
        &self,
        _turns: &[Turn],
        _options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        Ok(self.reply.clone())
    }

    fn model_id(&self) -> &str {
        "static"
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatErrorResponse {
    error: ChatErrorBody,
}

#[derive(Deserialize)]
struct ChatErrorBody {
    message: String,
}

/// OpenAI-compatible `/chat/completions` client.
pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAiGenerator {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| GenerationError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        })
    }

    fn classify(status: reqwest::StatusCode, message: String) -> GenerationError {
        match status.as_u16() {
            401 | 403 => GenerationError::auth(format!("Authentication failed: {message}")),
            429 => GenerationError::rate_limit(format!("Rate limit exceeded: {message}")),
            400 => GenerationError::invalid_request(format!("Invalid request: {message}")),
            500..=599 => GenerationError::server_error(format!("Server error: {message}")),
            _ => GenerationError::unknown(format!("HTTP {status}: {message}")),
        }
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(
        &self,
        turns: &[Turn],
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: turns,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    GenerationError::network(format!("Connection failed: {e}"))
                } else {
                    GenerationError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ChatErrorResponse>(&body)
                .map(|r| r.error.message)
                .unwrap_or(body);
            return Err(Self::classify(status, message));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::unknown(format!("Failed to parse response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::unknown("Response contained no message content"))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
