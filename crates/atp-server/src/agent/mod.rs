//! Agents own identity and turn an inbound task into an outbound one.

mod model_agent;
mod registry;

pub use model_agent::{AgentProfile, ModelAgent};
pub use registry::AgentRegistry;

use std::sync::Arc;

use async_trait::async_trait;
use atp_types::{AgentCard, Artifact, Message, Task, TaskState, TaskStatus};

use crate::error::ServerError;
use crate::generation::GenerationError;
use crate::task_store::{TaskStore, TaskUpdate};

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("task update rejected: {0}")]
    Store(#[from] ServerError),

    #[error("task {0} has no inbound message")]
    MissingMessage(String),

    #[error("agent panicked: {0}")]
    Panicked(String),
}

/// Processing unit behind the dispatcher.
#[async_trait]
pub trait Agent: Send + Sync + 'static {
    fn id(&self) -> &str;

    /// Discovery card. Pure.
    fn describe(&self) -> AgentCard;

    /// Runs one processing step on `task`. Every mutation goes through
    /// `updater`; the returned task is the state the step ended in.
    async fn process(&self, task: Task, updater: &TaskUpdater) -> Result<Task, AgentError>;
}

/// Write handle an agent gets for the task it is processing.
#[derive(Clone)]
pub struct TaskUpdater {
    store: Arc<dyn TaskStore>,
    task_id: String,
}

impl TaskUpdater {
    pub fn new(store: Arc<dyn TaskStore>, task_id: impl Into<String>) -> Self {
        Self {
            store,
            task_id: task_id.into(),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub async fn current(&self) -> Result<Task, ServerError> {
        self.store
            .get(&self.task_id)
            .await?
            .ok_or_else(|| ServerError::TaskNotFound(self.task_id.clone()))
    }

    /// Moves the task to `working` unless it already is.
    pub async fn start_working(&self) -> Result<Task, ServerError> {
        let task = self.current().await?;
        if task.status.state == TaskState::Working {
            return Ok(task);
        }
        self.set_status(TaskState::Working, None).await
    }

    pub async fn set_status(
        &self,
        state: TaskState,
        message: Option<Message>,
    ) -> Result<Task, ServerError> {
        self.store
            .update(&self.task_id, TaskUpdate::Status(TaskStatus::new(state, message)))
            .await
    }

    pub async fn add_artifact(&self, artifact: Artifact) -> Result<Task, ServerError> {
        self.store
            .update(&self.task_id, TaskUpdate::Artifact(artifact))
            .await
    }
}
