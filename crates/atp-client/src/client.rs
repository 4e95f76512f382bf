use atp_types::{
    AgentCard, Message, Task, TaskIdParams, TaskQueryParams, TaskSendParams,
};

use crate::error::ClientError;
use crate::jsonrpc_transport::JsonRpcTransport;
use crate::transport::{EventStream, Transport};

/// High-level ATP client.
///
/// Wraps a [`Transport`] and exposes one method per protocol operation.
pub struct AtpClient {
    transport: Box<dyn Transport>,
}

impl AtpClient {
    /// Create a client for the server advertised in `card`.
    pub fn from_agent_card(card: &AgentCard) -> Result<Self, ClientError> {
        Self::new(&card.url)
    }

    /// Create a client for the server rooted at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let transport = JsonRpcTransport::new(base_url)?;
        Ok(Self {
            transport: Box::new(transport),
        })
    }

    /// Create a client with a custom [`Transport`] implementation.
    pub fn with_transport(transport: impl Transport) -> Self {
        Self {
            transport: Box::new(transport),
        }
    }

    /// Create or continue a task and wait for the processing step to finish.
    pub async fn send_task(&self, params: TaskSendParams) -> Result<Task, ClientError> {
        self.transport.send_task(params).await
    }

    /// Shorthand for sending a single user text message to `task_id`.
    pub async fn send_text(&self, task_id: &str, text: &str) -> Result<Task, ClientError> {
        self.send_task(TaskSendParams::new(task_id, Message::user(text)))
            .await
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task, ClientError> {
        self.get_task_with_history(task_id, None).await
    }

    /// Get a task, keeping only the last `history_length` history messages.
    pub async fn get_task_with_history(
        &self,
        task_id: &str,
        history_length: Option<usize>,
    ) -> Result<Task, ClientError> {
        self.transport
            .get_task(TaskQueryParams::new(task_id).with_history_length(history_length))
            .await
    }

    pub async fn cancel_task(&self, task_id: &str) -> Result<Task, ClientError> {
        self.transport
            .cancel_task(TaskIdParams::new(task_id))
            .await
    }

    /// Like [`send_task`](Self::send_task), but returns the snapshot stream.
    pub async fn send_subscribe(&self, params: TaskSendParams) -> Result<EventStream, ClientError> {
        self.transport.send_subscribe(params).await
    }

    /// Attach to a task's snapshot stream.
    pub async fn resubscribe(&self, task_id: &str) -> Result<EventStream, ClientError> {
        self.transport
            .resubscribe(TaskIdParams::new(task_id))
            .await
    }
}
