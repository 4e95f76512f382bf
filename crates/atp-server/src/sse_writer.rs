use std::convert::Infallible;

use atp_types::{AtpError, JsonRpcError, JsonRpcId, JsonRpcResponse, TaskEvent};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures_core::Stream;
use tokio_stream::StreamExt;

use crate::event_queue::EventStream;

/// Convert an `EventStream` into an axum SSE response.
///
/// Snapshots become success envelopes; error events become error envelopes.
pub fn event_stream_to_sse(
    stream: EventStream,
    request_id: JsonRpcId,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let sse_stream = stream.map(move |result| {
        let response = to_envelope(result, &request_id);
        let data = serde_json::to_string(&response).unwrap_or_default();
        let id = uuid::Uuid::new_v4().to_string();
        Ok(SseEvent::default().id(id).data(data))
    });

    Sse::new(sse_stream).keep_alive(KeepAlive::default())
}

/// A stream carrying a single error event, for failures detected before any
/// snapshot could be produced.
pub fn error_to_sse(
    error: AtpError,
    request_id: JsonRpcId,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let stream: EventStream = Box::pin(tokio_stream::once(Ok(TaskEvent::Error(error))));
    event_stream_to_sse(stream, request_id)
}

fn to_envelope(
    result: Result<TaskEvent, crate::error::ServerError>,
    request_id: &JsonRpcId,
) -> JsonRpcResponse {
    match result {
        Ok(TaskEvent::Status(update)) => {
            let value = serde_json::to_value(&update).unwrap_or_default();
            JsonRpcResponse::success(request_id.clone(), value)
        }
        Ok(TaskEvent::Error(err)) => JsonRpcResponse::error(request_id.clone(), err.into()),
        Err(err) => {
            let rpc_error: JsonRpcError = (&err).into();
            JsonRpcResponse::error(request_id.clone(), rpc_error)
        }
    }
}
