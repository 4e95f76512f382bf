use std::sync::Arc;

use async_trait::async_trait;
use atp_types::{
    AgentCapabilities, AgentCard, AgentSkill, Artifact, ConversationMessage, FileSource, Message,
    Part, Role, Task, TaskState,
};

use super::{Agent, AgentError, TaskUpdater};
use crate::conversation::ConversationStore;
use crate::generation::{GenerationOptions, Generator, Turn, TurnRole};

const DEFAULT_DESCRIPTION: &str = "ATP compatible agent";
const DEFAULT_URL: &str = "http://localhost:8000";

/// Behavioural knobs that distinguish one deployed agent from another.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentProfile {
    /// Appended to the system turn.
    pub persona: String,
    /// Number of prior messages sent to the generator.
    pub context_window: usize,
    pub options: GenerationOptions,
    /// A reply starting with this marker asks the caller for more input.
    pub input_request_prefix: Option<String>,
    pub skills: Vec<String>,
}

impl AgentProfile {
    /// Deliberate, longer answers.
    pub fn reasoning() -> Self {
        Self {
            persona: "Follow the Agent-to-Agent protocol when communicating.".into(),
            context_window: 5,
            options: GenerationOptions {
                temperature: 0.7,
                max_tokens: 500,
            },
            input_request_prefix: None,
            skills: vec![
                "analyze_data".into(),
                "complex_reasoning".into(),
                "task_planning".into(),
            ],
        }
    }

    /// Short, efficient answers.
    pub fn concise() -> Self {
        Self {
            persona: "Be concise and efficient in your responses.".into(),
            context_window: 3,
            options: GenerationOptions {
                temperature: 0.5,
                max_tokens: 300,
            },
            input_request_prefix: None,
            skills: vec![
                "answer_questions".into(),
                "summarize_text".into(),
                "basic_reasoning".into(),
            ],
        }
    }

    pub fn with_input_request_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.input_request_prefix = Some(prefix.into());
        self
    }
}

/// The one concrete agent type; deployments differ only by [`AgentProfile`].
pub struct ModelAgent {
    id: String,
    name: String,
    description: String,
    url: String,
    version: String,
    profile: AgentProfile,
    generator: Arc<dyn Generator>,
}

impl ModelAgent {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        profile: AgentProfile,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: DEFAULT_DESCRIPTION.into(),
            url: DEFAULT_URL.into(),
            version: "1.0".into(),
            profile,
            generator,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    fn system_turn(&self) -> Turn {
        Turn::system(format!(
            "You are {}, {}. {}",
            self.name, self.description, self.profile.persona
        ))
    }

    fn tail<T>(&self, items: &[T]) -> usize {
        items.len().saturating_sub(self.profile.context_window)
    }

    /// System turn followed by the last `context_window` messages.
    fn task_prompt(&self, task: &Task) -> Vec<Turn> {
        let fallback;
        let history: &[Message] = match (&task.history, &task.status.message) {
            (Some(history), _) => history.as_slice(),
            (None, Some(message)) => {
                fallback = [message.clone()];
                &fallback
            }
            (None, None) => &[],
        };

        let mut turns = vec![self.system_turn()];
        for message in &history[self.tail(history)..] {
            let role = match message.role {
                Role::User => TurnRole::User,
                Role::Agent => TurnRole::Assistant,
            };
            turns.push(Turn::new(role, render_parts(&message.parts)));
        }
        turns
    }

    /// Splits off the input-request marker, if the profile declares one.
    fn needs_input<'a>(&self, reply: &'a str) -> Option<&'a str> {
        let prefix = self.profile.input_request_prefix.as_deref()?;
        reply.strip_prefix(prefix).map(str::trim_start)
    }

    /// Legacy point-to-point exchange: records `inbound` in the session,
    /// generates a reply addressed back to its sender, records and returns it.
    pub async fn reply(
        &self,
        store: &ConversationStore,
        session_id: &str,
        inbound: ConversationMessage,
    ) -> Result<ConversationMessage, AgentError> {
        let inbound_id = inbound.id.clone();
        let recipient = inbound.sender_id.clone();
        store.append(session_id, inbound).await?;

        let history = store.history(session_id).await?;
        let mut turns = vec![self.system_turn()];
        for message in &history[self.tail(&history)..] {
            let role = if message.sender_id == self.id {
                TurnRole::Assistant
            } else {
                TurnRole::User
            };
            turns.push(Turn::new(role, render_parts(&message.parts)));
        }

        let text = self
            .generator
            .generate(&turns, &self.profile.options)
            .await?;

        let mut reply = ConversationMessage::text(self.id.clone(), recipient, text);
        reply.in_reply_to = Some(inbound_id);
        reply.sequence_num = Some(history.len() as u64 + 1);
        store.append(session_id, reply.clone()).await?;

        tracing::debug!(agent = %self.id, session_id, message_id = %reply.id, "conversation reply");
        Ok(reply)
    }
}

/// Flattens parts into prompt text: text verbatim, data as pretty JSON,
/// files as a placeholder.
fn render_parts(parts: &[Part]) -> String {
    parts
        .iter()
        .map(|part| match part {
            Part::Text { text, .. } => text.clone(),
            Part::Data { data, .. } => {
                let json = serde_json::to_string_pretty(data).unwrap_or_default();
                format!("JSON Data: {json}")
            }
            Part::File { file, .. } => {
                let label = match (&file.name, &file.source) {
                    (Some(name), _) => name.as_str(),
                    (None, FileSource::Uri { uri }) => uri.as_str(),
                    (None, FileSource::Bytes { .. }) => "unnamed",
                };
                format!("[File: {label}]")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Agent for ModelAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn describe(&self) -> AgentCard {
        AgentCard {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            url: self.url.clone(),
            provider: None,
            version: self.version.clone(),
            documentation_url: None,
            capabilities: AgentCapabilities {
                streaming: true,
                push_notifications: false,
                state_transition_history: true,
            },
            default_input_modes: vec!["text".into(), "data".into()],
            default_output_modes: vec!["text".into()],
            skills: self
                .profile
                .skills
                .iter()
                .map(|skill| AgentSkill {
                    id: skill.clone(),
                    name: skill.replace('_', " "),
                    description: None,
                    tags: None,
                    examples: None,
                    input_modes: None,
                    output_modes: None,
                })
                .collect(),
        }
    }

    async fn process(&self, task: Task, updater: &TaskUpdater) -> Result<Task, AgentError> {
        if task.status.message.is_none() {
            return Err(AgentError::MissingMessage(task.id));
        }

        let task = updater.start_working().await?;
        let turns = self.task_prompt(&task);
        tracing::debug!(agent = %self.id, task_id = %task.id, turns = turns.len(), "generating");

        let reply = self
            .generator
            .generate(&turns, &self.profile.options)
            .await?;

        if let Some(question) = self.needs_input(&reply) {
            let task = updater
                .set_status(TaskState::InputRequired, Some(Message::agent(question)))
                .await?;
            return Ok(task);
        }

        updater
            .add_artifact(Artifact::named("response", vec![Part::text(reply.clone())]))
            .await?;
        let task = updater
            .set_status(TaskState::Completed, Some(Message::agent(reply)))
            .await?;
        Ok(task)
    }
}
