pub mod agent_card;
pub mod artifact;
pub mod conversation;
pub mod error;
pub mod event;
pub mod jsonrpc;
pub mod message;
pub mod part;
pub mod task;

// Convenience re-exports
pub use agent_card::{AgentCapabilities, AgentCard, AgentProvider, AgentSkill};
pub use artifact::Artifact;
pub use conversation::{ConversationMessage, ConversationSession, SYSTEM_PARTICIPANT};
pub use error::{AtpError, AtpErrorCode};
pub use event::{TaskEvent, TaskStatusUpdateEvent};
pub use jsonrpc::{
    JsonRpcError, JsonRpcId, JsonRpcRequest, JsonRpcResponse, TaskIdParams, TaskQueryParams,
    TaskSendParams, METHOD_CANCEL, METHOD_GET, METHOD_RESUBSCRIBE, METHOD_SEND,
    METHOD_SEND_SUBSCRIBE,
};
pub use message::{Message, Role};
pub use part::{DataMap, FileContent, FileSource, Part};
pub use task::{Task, TaskState, TaskStatus};
