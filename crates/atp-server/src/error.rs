use atp_types::{AtpError, AtpErrorCode, JsonRpcError, TaskState};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task cannot be canceled: {0}")]
    TaskNotCancelable(String),

    #[error("Task is not in input-required state: {0}")]
    TaskNotInputRequired(String),

    #[error("Illegal transition for task {task_id}: {from} -> {to}")]
    InvalidTransition {
        task_id: String,
        from: TaskState,
        to: TaskState,
    },

    #[error("Task already exists: {0}")]
    TaskExists(String),

    #[error("No agents registered")]
    NoAgentRegistered,

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Message participants are not part of conversation {0}")]
    NotAParticipant(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Queue closed")]
    QueueClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<&ServerError> for AtpError {
    fn from(err: &ServerError) -> Self {
        match err {
            ServerError::TaskNotFound(_) => AtpError::from(AtpErrorCode::TaskNotFound),
            ServerError::TaskNotCancelable(_) => AtpError::from(AtpErrorCode::TaskNotCancelable),
            ServerError::TaskNotInputRequired(_) => AtpError::new(
                AtpErrorCode::InternalError,
                "Task is not in input-required state",
            ),
            ServerError::InvalidParams(msg) => {
                AtpError::new(AtpErrorCode::InvalidParams, msg.clone())
            }
            ServerError::NoAgentRegistered => {
                AtpError::new(AtpErrorCode::InternalError, "No agents registered")
            }
            other => AtpError::new(AtpErrorCode::InternalError, other.to_string()),
        }
    }
}

impl From<&ServerError> for JsonRpcError {
    fn from(err: &ServerError) -> Self {
        let atp: AtpError = err.into();
        atp.into()
    }
}
