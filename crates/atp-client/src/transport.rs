use std::pin::Pin;

use atp_types::{Task, TaskIdParams, TaskQueryParams, TaskSendParams, TaskStatusUpdateEvent};
use futures_core::Stream;

use crate::error::ClientError;

/// Snapshots pushed by a streaming ATP response.
pub type EventStream =
    Pin<Box<dyn Stream<Item = Result<TaskStatusUpdateEvent, ClientError>> + Send>>;

/// Transport layer abstraction for ATP communication.
///
/// Default implementation: [`crate::JsonRpcTransport`].
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send_task(&self, params: TaskSendParams) -> Result<Task, ClientError>;

    async fn get_task(&self, params: TaskQueryParams) -> Result<Task, ClientError>;

    async fn cancel_task(&self, params: TaskIdParams) -> Result<Task, ClientError>;

    async fn send_subscribe(&self, params: TaskSendParams) -> Result<EventStream, ClientError>;

    async fn resubscribe(&self, params: TaskIdParams) -> Result<EventStream, ClientError>;
}
