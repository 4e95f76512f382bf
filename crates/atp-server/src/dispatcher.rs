use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use atp_types::{
    AtpError, Message, Task, TaskEvent, TaskIdParams, TaskQueryParams, TaskSendParams, TaskState,
    TaskStatus, TaskStatusUpdateEvent,
};
use futures_core::Stream;
use tokio_stream::StreamExt;

use crate::agent::{Agent, AgentError, AgentRegistry, TaskUpdater};
use crate::error::ServerError;
use crate::event_queue::{EventQueueManager, EventStream, InMemoryEventQueueManager};
use crate::task_store::{InMemoryTaskStore, TaskStore, TaskUpdate};

const CANCEL_MESSAGE: &str = "Task canceled by request";

/// Handles ATP task requests.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Creates or continues a task and waits for the processing step.
    async fn on_send(&self, params: TaskSendParams) -> Result<Task, ServerError>;

    async fn on_get(&self, params: TaskQueryParams) -> Result<Task, ServerError>;

    async fn on_cancel(&self, params: TaskIdParams) -> Result<Task, ServerError>;

    /// Like `on_send`, but processing runs in the background and the caller
    /// observes it through the returned snapshot stream.
    async fn on_send_subscribe(&self, params: TaskSendParams) -> Result<EventStream, ServerError>;

    async fn on_resubscribe(&self, params: TaskIdParams) -> Result<EventStream, ServerError>;
}

/// Owns the task table and the per-task fan-out, and routes work to agents.
#[derive(Clone)]
pub struct TaskDispatcher {
    agents: Arc<AgentRegistry>,
    task_store: Arc<dyn TaskStore>,
    queue_manager: Arc<dyn EventQueueManager>,
}

/// Builder for `TaskDispatcher`.
pub struct TaskDispatcherBuilder {
    agents: Option<Arc<AgentRegistry>>,
    task_store: Option<Arc<dyn TaskStore>>,
    queue_manager: Option<Arc<dyn EventQueueManager>>,
}

impl TaskDispatcher {
    pub fn builder() -> TaskDispatcherBuilder {
        TaskDispatcherBuilder {
            agents: None,
            task_store: None,
            queue_manager: None,
        }
    }

    pub fn agents(&self) -> &Arc<AgentRegistry> {
        &self.agents
    }
}

impl TaskDispatcherBuilder {
    pub fn agents(mut self, agents: Arc<AgentRegistry>) -> Self {
        self.agents = Some(agents);
        self
    }

    pub fn task_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.task_store = Some(store);
        self
    }

    pub fn queue_manager(mut self, mgr: Arc<dyn EventQueueManager>) -> Self {
        self.queue_manager = Some(mgr);
        self
    }

    pub fn build(self) -> TaskDispatcher {
        TaskDispatcher {
            agents: self.agents.unwrap_or_default(),
            task_store: self
                .task_store
                .unwrap_or_else(|| Arc::new(InMemoryTaskStore::new())),
            queue_manager: self
                .queue_manager
                .unwrap_or_else(|| Arc::new(InMemoryEventQueueManager::new())),
        }
    }
}

impl TaskDispatcher {
    /// Records a new task in `submitted`, or accepts a follow-up message for
    /// an `input-required` one. Nothing is mutated on rejection.
    async fn accept(&self, params: &TaskSendParams) -> Result<Task, ServerError> {
        if self.task_store.get(&params.id).await?.is_none() {
            let session_id = params
                .session_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let task = Task::submitted(
                params.id.clone(),
                Some(session_id.clone()),
                params.message.clone(),
                params.metadata.clone(),
            );
            match self.task_store.insert(task.clone()).await {
                Ok(()) => {
                    let (session_tasks, _) =
                        self.task_store.list(Some(&session_id), None, None).await?;
                    tracing::info!(
                        task_id = %task.id,
                        session_id = %session_id,
                        session_tasks = session_tasks.len(),
                        "task submitted"
                    );
                    return Ok(task);
                }
                // Lost a race with another send for the same id.
                Err(ServerError::TaskExists(_)) => {}
                Err(e) => return Err(e),
            }
        }

        let task = self
            .task_store
            .update(&params.id, TaskUpdate::Resume(params.message.clone()))
            .await?;
        tracing::info!(task_id = %task.id, "task resumed with new input");
        Ok(task)
    }

    /// Pushes a snapshot of `task` to its listeners, if any. A final snapshot
    /// closes and removes the channel.
    async fn publish(&self, task: &Task) {
        let Some(queue) = self.queue_manager.get(&task.id) else {
            return;
        };
        let event = TaskStatusUpdateEvent::snapshot(task);
        let is_final = event.is_final;
        if let Err(e) = queue.write(event.into()).await {
            tracing::debug!(task_id = %task.id, error = %e, "snapshot dropped");
        }
        if is_final {
            self.queue_manager.destroy(&task.id);
        }
    }

    async fn publish_error(&self, task_id: &str, err: &ServerError) {
        if let Some(queue) = self.queue_manager.get(task_id) {
            let _ = queue.write(TaskEvent::Error(AtpError::from(err))).await;
            self.queue_manager.destroy(task_id);
        }
    }

    /// Runs one processing step and publishes the resulting snapshot.
    async fn execute(&self, agent: Arc<dyn Agent>, task: Task) -> Result<Task, ServerError> {
        let task_id = task.id.clone();
        let updater = TaskUpdater::new(self.task_store.clone(), task_id.clone());

        let outcome = run_agent(agent.clone(), task, updater.clone()).await;
        match self.settle(&updater, outcome).await {
            Ok(task) => {
                tracing::info!(task_id = %task_id, agent = agent.id(), state = %task.status.state, "processing step finished");
                self.publish(&task).await;
                Ok(task)
            }
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "failed to record processing result");
                self.publish_error(&task_id, &e).await;
                Err(e)
            }
        }
    }

    /// Leaves the task in `completed`, `failed` or `input-required`, or
    /// whatever terminal state it reached concurrently.
    async fn settle(
        &self,
        updater: &TaskUpdater,
        outcome: Result<Task, AgentError>,
    ) -> Result<Task, ServerError> {
        let current = updater.current().await?;
        let state = current.status.state;

        if state.is_terminal() {
            if let Err(e) = &outcome {
                tracing::info!(task_id = %current.id, state = %state, error = %e, "ignoring late processing error");
            }
            return Ok(current);
        }

        match outcome {
            Ok(_) if state == TaskState::InputRequired => Ok(current),
            Ok(_) => {
                tracing::warn!(task_id = %current.id, state = %state, "processing ended early; forcing completed");
                self.force(updater, TaskState::Completed, None).await
            }
            Err(e) => {
                tracing::error!(task_id = %current.id, error = %e, "processing failed");
                let message = Message::agent(format!("Error processing task: {e}"));
                self.force(updater, TaskState::Failed, Some(message)).await
            }
        }
    }

    /// Moves to `state` through `working`. If the task went terminal in the
    /// meantime, that state wins.
    async fn force(
        &self,
        updater: &TaskUpdater,
        state: TaskState,
        message: Option<Message>,
    ) -> Result<Task, ServerError> {
        let result = match updater.start_working().await {
            Ok(_) => updater.set_status(state, message).await,
            Err(e) => Err(e),
        };
        match result {
            Err(ServerError::InvalidTransition { .. }) => {
                let current = updater.current().await?;
                if current.status.state.is_terminal() {
                    Ok(current)
                } else {
                    Err(ServerError::InvalidTransition {
                        task_id: current.id,
                        from: current.status.state,
                        to: state,
                    })
                }
            }
            other => other,
        }
    }
}

#[async_trait]
impl RequestHandler for TaskDispatcher {
    async fn on_send(&self, params: TaskSendParams) -> Result<Task, ServerError> {
        let agent = self.agents.route()?;
        let task = self.accept(&params).await?;
        self.publish(&task).await;

        let task = self.execute(agent, task).await?;
        Ok(task.with_history_length(params.history_length))
    }

    async fn on_get(&self, params: TaskQueryParams) -> Result<Task, ServerError> {
        let task = self
            .task_store
            .get(&params.id)
            .await?
            .ok_or(ServerError::TaskNotFound(params.id))?;
        Ok(task.with_history_length(params.history_length))
    }

    async fn on_cancel(&self, params: TaskIdParams) -> Result<Task, ServerError> {
        let task = self
            .task_store
            .get(&params.id)
            .await?
            .ok_or_else(|| ServerError::TaskNotFound(params.id.clone()))?;

        if !task.status.state.is_cancelable() {
            return Err(ServerError::TaskNotCancelable(params.id));
        }

        let status = TaskStatus::new(TaskState::Canceled, Some(Message::agent(CANCEL_MESSAGE)));
        let canceled = match self
            .task_store
            .update(&params.id, TaskUpdate::Status(status))
            .await
        {
            // Went terminal between the read and the update.
            Err(ServerError::InvalidTransition { .. }) => {
                return Err(ServerError::TaskNotCancelable(params.id))
            }
            other => other?,
        };

        tracing::info!(task_id = %canceled.id, "task canceled");
        self.publish(&canceled).await;
        Ok(canceled)
    }

    async fn on_send_subscribe(&self, params: TaskSendParams) -> Result<EventStream, ServerError> {
        let agent = self.agents.route()?;
        let task = self.accept(&params).await?;

        // Subscribe before publishing so the caller sees every event.
        let queue = self.queue_manager.get_or_create(&task.id);
        let live = queue.subscribe()?;
        self.publish(&task).await;

        let this = self.clone();
        tokio::spawn(async move {
            let _ = this.execute(agent, task).await;
        });

        Ok(Box::pin(TakeUntil::new(live, ends_processing_step)))
    }

    async fn on_resubscribe(&self, params: TaskIdParams) -> Result<EventStream, ServerError> {
        let task = self
            .task_store
            .get(&params.id)
            .await?
            .ok_or_else(|| ServerError::TaskNotFound(params.id.clone()))?;

        if task.status.state.is_terminal() {
            return Ok(snapshot_only(&task));
        }

        let live = match self.queue_manager.get_or_create(&task.id).subscribe() {
            Ok(live) => live,
            // A final write closed the queue after get_or_create handed it out.
            Err(ServerError::QueueClosed) => {
                let task = self
                    .task_store
                    .get(&params.id)
                    .await?
                    .ok_or_else(|| ServerError::TaskNotFound(params.id.clone()))?;
                if task.status.state.is_terminal() {
                    return Ok(snapshot_only(&task));
                }
                self.queue_manager.get_or_create(&task.id).subscribe()?
            }
            Err(e) => return Err(e),
        };

        // Re-read after subscribing: anything newer now arrives on `live`.
        let task = self
            .task_store
            .get(&params.id)
            .await?
            .ok_or(ServerError::TaskNotFound(params.id))?;
        if task.status.state.is_terminal() {
            self.queue_manager.destroy(&task.id);
            return Ok(snapshot_only(&task));
        }

        // The version just read can still be published on `live`; skip it.
        let current: TaskEvent = TaskStatusUpdateEvent::snapshot(&task).into();
        let repeat = current.clone();
        let live = live.skip_while(move |item| matches!(item, Ok(event) if *event == repeat));
        let current = tokio_stream::once(Ok(current));
        Ok(Box::pin(TakeUntil::new(current.chain(live), TaskEvent::is_final)))
    }
}

/// Runs `agent.process` on its own task; a panic comes back as
/// `AgentError::Panicked`.
async fn run_agent(
    agent: Arc<dyn Agent>,
    task: Task,
    updater: TaskUpdater,
) -> Result<Task, AgentError> {
    let handle = tokio::spawn(async move { agent.process(task, &updater).await });
    match handle.await {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(AgentError::Panicked(reason))
        }
        Err(e) => Err(AgentError::Panicked(e.to_string())),
    }
}

fn snapshot_only(task: &Task) -> EventStream {
    Box::pin(tokio_stream::once(Ok(TaskStatusUpdateEvent::snapshot(task).into())))
}

/// A `sendSubscribe` stream ends with the step's result: a final snapshot,
/// an error, or a request for more input.
fn ends_processing_step(event: &TaskEvent) -> bool {
    match event {
        TaskEvent::Status(update) => {
            update.is_final || update.status.state == TaskState::InputRequired
        }
        TaskEvent::Error(_) => true,
    }
}

/// A stream adapter that stops after the first event matching `last`.
struct TakeUntil<S> {
    inner: Pin<Box<S>>,
    last: fn(&TaskEvent) -> bool,
    done: bool,
}

impl<S> TakeUntil<S> {
    fn new(stream: S, last: fn(&TaskEvent) -> bool) -> Self {
        Self {
            inner: Box::pin(stream),
            last,
            done: false,
        }
    }
}

impl<S> Stream for TakeUntil<S>
where
    S: Stream<Item = Result<TaskEvent, ServerError>>,
{
    type Item = Result<TaskEvent, ServerError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(event))) => {
                if (self.last)(&event) {
                    self.done = true;
                }
                Poll::Ready(Some(Ok(event)))
            }
            Poll::Ready(Some(Err(e))) => {
                self.done = true;
                Poll::Ready(Some(Err(e)))
            }
            other => other,
        }
    }
}
