use atp_types::JsonRpcError;

/// Client-side errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON-RPC error: code={}, message={}", .0.code, .0.message)]
    JsonRpc(JsonRpcError),

    #[error("Empty result in JSON-RPC response")]
    EmptyResult,

    #[error("SSE parse error: {0}")]
    SseParse(String),

    #[error("Stream closed unexpectedly")]
    StreamClosed,
}

impl ClientError {
    /// JSON-RPC error code, when the server answered with one.
    pub fn rpc_code(&self) -> Option<i32> {
        match self {
            ClientError::JsonRpc(e) => Some(e.code),
            _ => None,
        }
    }
}
