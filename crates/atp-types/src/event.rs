use serde::{Deserialize, Serialize};

use crate::error::AtpError;
use crate::part::DataMap;
use crate::task::{Task, TaskStatus};

/// Snapshot pushed to stream listeners: `{id, status, final}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    pub id: String,
    pub status: TaskStatus,
    #[serde(rename = "final", default)]
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DataMap>,
}

impl TaskStatusUpdateEvent {
    /// Snapshot of `task`; `final` is set when the task is terminal.
    pub fn snapshot(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            status: task.status.clone(),
            is_final: task.status.state.is_terminal(),
            metadata: None,
        }
    }
}

/// Item carried on a task's fan-out channel.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    Status(TaskStatusUpdateEvent),
    /// Internal failure; the channel closes after it.
    Error(AtpError),
}

impl TaskEvent {
    /// Whether the channel ends after this event.
    pub fn is_final(&self) -> bool {
        match self {
            TaskEvent::Status(update) => update.is_final,
            TaskEvent::Error(_) => true,
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            TaskEvent::Status(update) => Some(&update.id),
            TaskEvent::Error(_) => None,
        }
    }
}

impl From<TaskStatusUpdateEvent> for TaskEvent {
    fn from(update: TaskStatusUpdateEvent) -> Self {
        TaskEvent::Status(update)
    }
}
