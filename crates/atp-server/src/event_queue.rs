use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use atp_types::TaskEvent;
use futures_core::Stream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::error::ServerError;

/// Type alias for a stream of task events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<TaskEvent, ServerError>> + Send>>;

/// Publishes events to every listener of one task.
#[async_trait]
pub trait EventQueueWriter: Send + Sync {
    /// Broadcasts `event`. A final event (terminal snapshot or error) also
    /// closes the queue.
    async fn write(&self, event: TaskEvent) -> Result<(), ServerError>;
}

/// Attaches listeners to one task.
pub trait EventQueueReader: Send + Sync {
    /// Fails with `QueueClosed` once the queue has been closed.
    fn subscribe(&self) -> Result<EventStream, ServerError>;
    fn is_closed(&self) -> bool;
}

/// Combined event queue interface.
pub trait EventQueue: EventQueueWriter + EventQueueReader {}

/// Manages event queues keyed by task ID.
pub trait EventQueueManager: Send + Sync + 'static {
    fn get_or_create(&self, task_id: &str) -> Arc<dyn EventQueue>;
    fn get(&self, task_id: &str) -> Option<Arc<dyn EventQueue>>;
    fn destroy(&self, task_id: &str);
}

/// In-memory event queue backed by `tokio::sync::broadcast`.
///
/// The broadcast sender lives in a `RwLock<Option<...>>`; a final write
/// drops it, which ends every subscriber stream.
pub struct InMemoryEventQueue {
    sender: RwLock<Option<broadcast::Sender<TaskEvent>>>,
}

const DEFAULT_BROADCAST_CAPACITY: usize = 32;

impl InMemoryEventQueue {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Self {
            sender: RwLock::new(Some(sender)),
        }
    }
}

impl Default for InMemoryEventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventQueueWriter for InMemoryEventQueue {
    async fn write(&self, event: TaskEvent) -> Result<(), ServerError> {
        let mut sender = self.sender.write().expect("RwLock poisoned");
        let Some(tx) = sender.as_ref() else {
            return Err(ServerError::QueueClosed);
        };
        let is_final = event.is_final();
        // No receivers is not an error.
        let _ = tx.send(event);
        if is_final {
            *sender = None;
        }
        Ok(())
    }
}

impl EventQueueReader for InMemoryEventQueue {
    fn subscribe(&self) -> Result<EventStream, ServerError> {
        let sender = self.sender.read().expect("RwLock poisoned");
        let sender = sender.as_ref().ok_or(ServerError::QueueClosed)?;
        let stream = BroadcastStream::new(sender.subscribe()).filter_map(|result| match result {
            Ok(event) => Some(Ok(event)),
            Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event listener lagged");
                None
            }
        });
        Ok(Box::pin(stream))
    }

    fn is_closed(&self) -> bool {
        self.sender.read().expect("RwLock poisoned").is_none()
    }
}

impl EventQueue for InMemoryEventQueue {}

/// In-memory event queue manager using `std::sync::RwLock` for fast synchronous access.
pub struct InMemoryEventQueueManager {
    queues: RwLock<HashMap<String, Arc<InMemoryEventQueue>>>,
}

impl InMemoryEventQueueManager {
    pub fn new() -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryEventQueueManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueueManager for InMemoryEventQueueManager {
    /// Returns the live queue for `task_id`, replacing one that was closed
    /// but not yet destroyed.
    fn get_or_create(&self, task_id: &str) -> Arc<dyn EventQueue> {
        // Fast path: read lock
        {
            let queues = self.queues.read().expect("RwLock poisoned");
            if let Some(queue) = queues.get(task_id) {
                if !queue.is_closed() {
                    return queue.clone();
                }
            }
        }
        // Slow path: write lock
        let mut queues = self.queues.write().expect("RwLock poisoned");
        let queue = queues
            .entry(task_id.to_string())
            .or_insert_with(|| Arc::new(InMemoryEventQueue::new()));
        if queue.is_closed() {
            *queue = Arc::new(InMemoryEventQueue::new());
        }
        queue.clone()
    }

    fn get(&self, task_id: &str) -> Option<Arc<dyn EventQueue>> {
        let queues = self.queues.read().expect("RwLock poisoned");
        queues
            .get(task_id)
            .map(|q| q.clone() as Arc<dyn EventQueue>)
    }

    fn destroy(&self, task_id: &str) {
        let mut queues = self.queues.write().expect("RwLock poisoned");
        queues.remove(task_id);
    }
}
