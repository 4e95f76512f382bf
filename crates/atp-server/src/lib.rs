pub mod agent;
pub mod agent_card_serve;
pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod event_queue;
pub mod generation;
pub mod jsonrpc_handler;
pub mod router;
pub mod sse_writer;
pub mod task_store;

pub use agent::{Agent, AgentError, AgentProfile, AgentRegistry, ModelAgent, TaskUpdater};
pub use config::{ConfigError, ProfileKind, ServerConfig};
pub use conversation::ConversationStore;
pub use dispatcher::{RequestHandler, TaskDispatcher, TaskDispatcherBuilder};
pub use error::ServerError;
pub use event_queue::{
    EventQueue, EventQueueManager, EventQueueReader, EventQueueWriter, EventStream,
    InMemoryEventQueue, InMemoryEventQueueManager,
};
pub use generation::{
    GenerationError, GenerationErrorKind, GenerationOptions, Generator, LoggingGenerator,
    MockGenerator, OpenAiGenerator, StaticGenerator, Turn, TurnRole,
};
pub use router::{create_router, serve, AppState};
pub use task_store::{InMemoryTaskStore, TaskStore, TaskUpdate};
