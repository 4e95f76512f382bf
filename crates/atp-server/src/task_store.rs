use std::collections::HashMap;

use async_trait::async_trait;
use atp_types::{Artifact, Message, Task, TaskState, TaskStatus};
use tokio::sync::RwLock;

use crate::error::ServerError;

/// A mutation applied to a stored task.
#[derive(Debug, Clone)]
pub enum TaskUpdate {
    /// Move to a new status. Checked against the lifecycle graph; a status
    /// message is also appended to the task history.
    Status(TaskStatus),
    /// Add an artifact, or extend the one at the same index when `append` is set.
    Artifact(Artifact),
    /// Accept a follow-up message for an `input-required` task and move it
    /// back to `working`.
    Resume(Message),
}

/// Authoritative task table.
#[async_trait]
pub trait TaskStore: Send + Sync + 'static {
    /// Records a new task. Fails if the id is already taken.
    async fn insert(&self, task: Task) -> Result<(), ServerError>;
    async fn get(&self, task_id: &str) -> Result<Option<Task>, ServerError>;
    /// Applies `update` atomically and returns the resulting task.
    async fn update(&self, task_id: &str, update: TaskUpdate) -> Result<Task, ServerError>;
    async fn list(
        &self,
        session_id: Option<&str>,
        page_size: Option<usize>,
        page_token: Option<&str>,
    ) -> Result<(Vec<Task>, Option<String>), ServerError>;
}

/// In-memory task store backed by `RwLock<HashMap>`.
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

fn apply(task: &mut Task, update: TaskUpdate) -> Result<(), ServerError> {
    let current = task.status.state;
    match update {
        TaskUpdate::Status(status) => {
            if !current.can_transition_to(status.state) {
                return Err(ServerError::InvalidTransition {
                    task_id: task.id.clone(),
                    from: current,
                    to: status.state,
                });
            }
            if let Some(message) = &status.message {
                task.history
                    .get_or_insert_with(Vec::new)
                    .push(message.clone());
            }
            task.status = status;
        }
        TaskUpdate::Artifact(artifact) => {
            if current.is_terminal() {
                return Err(ServerError::InvalidTransition {
                    task_id: task.id.clone(),
                    from: current,
                    to: current,
                });
            }
            let artifacts = task.artifacts.get_or_insert_with(Vec::new);
            let existing = artifacts
                .iter_mut()
                .find(|a| a.index == artifact.index);
            match existing {
                Some(existing) if artifact.is_append() => {
                    existing.parts.extend(artifact.parts);
                    if artifact.last_chunk.is_some() {
                        existing.last_chunk = artifact.last_chunk;
                    }
                }
                _ => artifacts.push(artifact),
            }
        }
        TaskUpdate::Resume(message) => {
            if current != TaskState::InputRequired {
                return Err(ServerError::TaskNotInputRequired(task.id.clone()));
            }
            task.history
                .get_or_insert_with(Vec::new)
                .push(message.clone());
            task.status = TaskStatus::new(TaskState::Working, Some(message));
        }
    }
    Ok(())
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, task: Task) -> Result<(), ServerError> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(ServerError::TaskExists(task.id));
        }
        tasks.insert(task.id.clone(), task);
        Ok(())
    }

    async fn get(&self, task_id: &str) -> Result<Option<Task>, ServerError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.get(task_id).cloned())
    }

    async fn update(&self, task_id: &str, update: TaskUpdate) -> Result<Task, ServerError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| ServerError::TaskNotFound(task_id.to_string()))?;

        // Work on a copy so a rejected update leaves the stored task untouched.
        let mut updated = task.clone();
        apply(&mut updated, update)?;
        *task = updated.clone();
        Ok(updated)
    }

    async fn list(
        &self,
        session_id: Option<&str>,
        page_size: Option<usize>,
        page_token: Option<&str>,
    ) -> Result<(Vec<Task>, Option<String>), ServerError> {
        let tasks = self.tasks.read().await;
        let mut items: Vec<&Task> = tasks.values().collect();

        if let Some(session) = session_id {
            items.retain(|t| t.session_id.as_deref() == Some(session));
        }

        // Sort by ID for stable pagination
        items.sort_by(|a, b| a.id.cmp(&b.id));

        // page_token = last seen task id
        if let Some(token) = page_token {
            items.retain(|t| t.id.as_str() > token);
        }

        let limit = page_size.unwrap_or(100);
        let has_more = items.len() > limit;
        let page: Vec<Task> = items.into_iter().take(limit).cloned().collect();
        let next_token = if has_more {
            page.last().map(|t| t.id.clone())
        } else {
            None
        };

        Ok((page, next_token))
    }
}
