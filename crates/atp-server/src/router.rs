use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::agent::AgentRegistry;
use crate::agent_card_serve::serve_agent_card;
use crate::dispatcher::{RequestHandler, TaskDispatcher};
use crate::error::ServerError;
use crate::jsonrpc_handler::{jsonrpc_handler, stream_handler};

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<dyn RequestHandler>,
    pub agents: Arc<AgentRegistry>,
}

/// Create an axum `Router` with the ATP endpoints.
pub fn create_router(handler: Arc<dyn RequestHandler>, agents: Arc<AgentRegistry>) -> Router {
    let state = AppState { handler, agents };

    Router::new()
        .route("/", post(jsonrpc_handler))
        .route("/stream", post(stream_handler))
        .route("/.well-known/agent.json", get(serve_agent_card))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Convenience function: serve `agents` on `addr` until ctrl-c.
pub async fn serve(agents: AgentRegistry, addr: &str) -> Result<(), ServerError> {
    let agents = Arc::new(agents);
    let handler = TaskDispatcher::builder().agents(agents.clone()).build();
    let router = create_router(Arc::new(handler), agents);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "ATP server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Io)?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
