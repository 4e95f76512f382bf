use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use atp_types::{
    JsonRpcId, JsonRpcRequest, JsonRpcResponse, Task, TaskIdParams, TaskQueryParams,
    TaskSendParams, METHOD_CANCEL, METHOD_GET, METHOD_RESUBSCRIBE, METHOD_SEND,
    METHOD_SEND_SUBSCRIBE,
};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ClientError;
use crate::sse::parse_sse_stream;
use crate::transport::{EventStream, Transport};

/// JSON-RPC over HTTP transport.
///
/// Request/response methods go to `{base}/`, streaming methods to
/// `{base}/stream`. Uses two `reqwest::Client` instances:
/// - `client`: 180-second timeout for request/response calls.
/// - `streaming_client`: no global timeout for SSE responses.
pub struct JsonRpcTransport {
    client: reqwest::Client,
    streaming_client: reqwest::Client,
    url: String,
    stream_url: String,
    request_id: AtomicI64,
}

impl JsonRpcTransport {
    /// Create a transport for the server rooted at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(180))
            .build()?;

        let streaming_client = reqwest::Client::builder().build()?;
        let base = base_url.trim_end_matches('/');

        Ok(Self {
            client,
            streaming_client,
            url: format!("{base}/"),
            stream_url: format!("{base}/stream"),
            request_id: AtomicI64::new(1),
        })
    }

    fn next_request(&self, method: &str, params: impl Serialize) -> Result<JsonRpcRequest, ClientError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        Ok(JsonRpcRequest::new(
            JsonRpcId::Number(id),
            method,
            serde_json::to_value(params)?,
        ))
    }

    /// Send a request/response call and deserialize the result.
    async fn send_jsonrpc<T: DeserializeOwned>(
        &self,
        method: &str,
        params: impl Serialize,
    ) -> Result<T, ClientError> {
        let request = self.next_request(method, params)?;
        tracing::debug!(method, "sending request");

        let response = self.client.post(&self.url).json(&request).send().await?;
        let jsonrpc_resp: JsonRpcResponse = response.json().await?;
        into_result(jsonrpc_resp)
    }

    /// Send a streaming call and return the snapshot stream.
    ///
    /// A plain JSON answer (e.g. an unknown method) is turned into an error.
    async fn send_jsonrpc_stream(
        &self,
        method: &str,
        params: impl Serialize,
    ) -> Result<EventStream, ClientError> {
        let request = self.next_request(method, params)?;
        tracing::debug!(method, "opening stream");

        let response = self
            .streaming_client
            .post(&self.stream_url)
            .json(&request)
            .send()
            .await?;

        let is_sse = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));
        if !is_sse {
            let jsonrpc_resp: JsonRpcResponse = response.json().await?;
            return match jsonrpc_resp.error {
                Some(error) => Err(ClientError::JsonRpc(error)),
                None => Err(ClientError::SseParse("expected an event stream".into())),
            };
        }

        Ok(parse_sse_stream(response.bytes_stream()))
    }
}

fn into_result<T: DeserializeOwned>(response: JsonRpcResponse) -> Result<T, ClientError> {
    if let Some(error) = response.error {
        return Err(ClientError::JsonRpc(error));
    }
    let result = response.result.ok_or(ClientError::EmptyResult)?;
    serde_json::from_value(result).map_err(Into::into)
}

#[async_trait::async_trait]
impl Transport for JsonRpcTransport {
    async fn send_task(&self, params: TaskSendParams) -> Result<Task, ClientError> {
        self.send_jsonrpc(METHOD_SEND, params).await
    }

    async fn get_task(&self, params: TaskQueryParams) -> Result<Task, ClientError> {
        self.send_jsonrpc(METHOD_GET, params).await
    }

    async fn cancel_task(&self, params: TaskIdParams) -> Result<Task, ClientError> {
        self.send_jsonrpc(METHOD_CANCEL, params).await
    }

    async fn send_subscribe(&self, params: TaskSendParams) -> Result<EventStream, ClientError> {
        self.send_jsonrpc_stream(METHOD_SEND_SUBSCRIBE, params).await
    }

    async fn resubscribe(&self, params: TaskIdParams) -> Result<EventStream, ClientError> {
        self.send_jsonrpc_stream(METHOD_RESUBSCRIBE, params).await
    }
}
