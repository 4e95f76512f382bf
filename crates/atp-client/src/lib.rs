pub mod agent_card_resolver;
pub mod client;
pub mod error;
pub mod jsonrpc_transport;
pub mod sse;
pub mod transport;

pub use agent_card_resolver::AgentCardResolver;
pub use client::AtpClient;
pub use error::ClientError;
pub use jsonrpc_transport::JsonRpcTransport;
pub use transport::{EventStream, Transport};
