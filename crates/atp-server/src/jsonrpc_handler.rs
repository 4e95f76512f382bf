use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;

use atp_types::{
    AtpError, AtpErrorCode, JsonRpcError, JsonRpcId, JsonRpcRequest, JsonRpcResponse,
    TaskIdParams, TaskQueryParams, TaskSendParams, METHOD_CANCEL, METHOD_GET, METHOD_RESUBSCRIBE,
    METHOD_SEND, METHOD_SEND_SUBSCRIBE,
};

use crate::error::ServerError;
use crate::router::AppState;
use crate::sse_writer::{error_to_sse, event_stream_to_sse};

/// `POST /`: request/response methods.
pub async fn jsonrpc_handler(State(state): State<AppState>, body: String) -> Response {
    let request = match parse_request(&body) {
        Ok(req) => req,
        Err(resp) => return Json(resp).into_response(),
    };
    let request_id = request.id.clone();
    let params = request.params.unwrap_or(serde_json::Value::Null);
    tracing::debug!(method = %request.method, "jsonrpc request");

    let response = match request.method.as_str() {
        METHOD_SEND => handle_send(&state, request_id, params).await,
        METHOD_GET => handle_get(&state, request_id, params).await,
        METHOD_CANCEL => handle_cancel(&state, request_id, params).await,
        other => Err(method_not_found(request_id, other)),
    };

    let json_resp = match response {
        Ok(resp) => resp,
        Err(resp) => resp,
    };
    Json(json_resp).into_response()
}

/// `POST /stream`: methods answered with an SSE snapshot stream.
pub async fn stream_handler(State(state): State<AppState>, body: String) -> Response {
    let request = match parse_request(&body) {
        Ok(req) => req,
        Err(resp) => return Json(resp).into_response(),
    };
    let request_id = request.id.clone();
    let params = request.params.unwrap_or(serde_json::Value::Null);
    tracing::debug!(method = %request.method, "jsonrpc stream request");

    let stream = match request.method.as_str() {
        METHOD_SEND_SUBSCRIBE => match parse_params::<TaskSendParams>(params) {
            Ok(p) => state.handler.on_send_subscribe(p).await,
            Err(e) => Err(e),
        },
        METHOD_RESUBSCRIBE => match parse_params::<TaskIdParams>(params) {
            Ok(p) => state.handler.on_resubscribe(p).await,
            Err(e) => Err(e),
        },
        other => return Json(method_not_found(request_id, other)).into_response(),
    };

    match stream {
        Ok(stream) => event_stream_to_sse(stream, request_id).into_response(),
        Err(e) => {
            tracing::info!(method = %request.method, error = %e, "stream request rejected");
            error_to_sse(AtpError::from(&e), request_id).into_response()
        }
    }
}

/// Parses the envelope. Malformed JSON is a parse error; well-formed JSON
/// that is not a JSON-RPC 2.0 request is an invalid request.
fn parse_request(body: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|_| JsonRpcResponse::error(JsonRpcId::Null, AtpErrorCode::ParseError.into()))?;

    let id = value
        .get("id")
        .and_then(|id| serde_json::from_value::<JsonRpcId>(id.clone()).ok())
        .unwrap_or_default();

    let request: JsonRpcRequest = serde_json::from_value(value).map_err(|_| {
        JsonRpcResponse::error(id.clone(), AtpErrorCode::InvalidRequest.into())
    })?;
    if request.jsonrpc != "2.0" {
        return Err(JsonRpcResponse::error(
            id,
            AtpErrorCode::InvalidRequest.into(),
        ));
    }
    Ok(request)
}

fn parse_params<T: DeserializeOwned>(params: serde_json::Value) -> Result<T, ServerError> {
    serde_json::from_value(params).map_err(|e| ServerError::InvalidParams(e.to_string()))
}

fn method_not_found(request_id: JsonRpcId, method: &str) -> JsonRpcResponse {
    tracing::info!(method, "method not found");
    JsonRpcResponse::error(request_id, AtpErrorCode::MethodNotFound.into())
}

fn respond<T: serde::Serialize>(
    request_id: JsonRpcId,
    result: Result<T, ServerError>,
) -> Result<JsonRpcResponse, JsonRpcResponse> {
    match result {
        Ok(value) => {
            let result = serde_json::to_value(&value).unwrap_or_default();
            Ok(JsonRpcResponse::success(request_id, result))
        }
        Err(e) => {
            let rpc_error: JsonRpcError = (&e).into();
            Err(JsonRpcResponse::error(request_id, rpc_error))
        }
    }
}

async fn handle_send(
    state: &AppState,
    request_id: JsonRpcId,
    params: serde_json::Value,
) -> Result<JsonRpcResponse, JsonRpcResponse> {
    let params: TaskSendParams = match parse_params(params) {
        Ok(p) => p,
        Err(e) => return respond::<()>(request_id, Err(e)),
    };
    respond(request_id, state.handler.on_send(params).await)
}

async fn handle_get(
    state: &AppState,
    request_id: JsonRpcId,
    params: serde_json::Value,
) -> Result<JsonRpcResponse, JsonRpcResponse> {
    let params: TaskQueryParams = match parse_params(params) {
        Ok(p) => p,
        Err(e) => return respond::<()>(request_id, Err(e)),
    };
    respond(request_id, state.handler.on_get(params).await)
}

async fn handle_cancel(
    state: &AppState,
    request_id: JsonRpcId,
    params: serde_json::Value,
) -> Result<JsonRpcResponse, JsonRpcResponse> {
    let params: TaskIdParams = match parse_params(params) {
        Ok(p) => p,
        Err(e) => return respond::<()>(request_id, Err(e)),
    };
    respond(request_id, state.handler.on_cancel(params).await)
}
