use serde::{Deserialize, Serialize};

use crate::error::{AtpError, AtpErrorCode};
use crate::message::Message;
use crate::part::DataMap;

pub const METHOD_SEND: &str = "tasks/send";
pub const METHOD_GET: &str = "tasks/get";
pub const METHOD_CANCEL: &str = "tasks/cancel";
pub const METHOD_SEND_SUBSCRIBE: &str = "tasks/sendSubscribe";
pub const METHOD_RESUBSCRIBE: &str = "tasks/resubscribe";

/// JSON-RPC 2.0 request ID
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcId {
    Number(i64),
    String(String),
    #[default]
    Null,
}

impl From<&str> for JsonRpcId {
    fn from(id: &str) -> Self {
        JsonRpcId::String(id.to_string())
    }
}

/// JSON-RPC 2.0 request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    #[serde(default)]
    pub id: JsonRpcId,
}

impl JsonRpcRequest {
    pub fn new(id: JsonRpcId, method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params: Some(params),
            id,
        }
    }
}

/// JSON-RPC 2.0 response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    #[serde(default)]
    pub id: JsonRpcId,
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl From<AtpError> for JsonRpcError {
    fn from(err: AtpError) -> Self {
        Self {
            code: err.code,
            message: err.message,
            data: err.data,
        }
    }
}

impl From<AtpErrorCode> for JsonRpcError {
    fn from(code: AtpErrorCode) -> Self {
        AtpError::from(code).into()
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl JsonRpcResponse {
    pub fn success(id: JsonRpcId, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: JsonRpcId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

// --- ATP Request Parameter Types ---

/// Parameters for tasks/send and tasks/sendSubscribe
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSendParams {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DataMap>,
}

impl TaskSendParams {
    pub fn new(id: impl Into<String>, message: Message) -> Self {
        Self {
            id: id.into(),
            session_id: None,
            message,
            history_length: None,
            metadata: None,
        }
    }
}

/// Parameters for tasks/get
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DataMap>,
}

impl TaskQueryParams {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            history_length: None,
            metadata: None,
        }
    }

    pub fn with_history_length(mut self, history_length: Option<usize>) -> Self {
        self.history_length = history_length;
        self
    }
}

/// Parameters for tasks/cancel and tasks/resubscribe
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskIdParams {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DataMap>,
}

impl TaskIdParams {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metadata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jsonrpc_id_variants() {
        let num: JsonRpcId = serde_json::from_str("42").unwrap();
        assert_eq!(num, JsonRpcId::Number(42));

        let s: JsonRpcId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(s, JsonRpcId::String("abc".into()));

        let null: JsonRpcId = serde_json::from_str("null").unwrap();
        assert_eq!(null, JsonRpcId::Null);
    }

    #[test]
    fn test_jsonrpc_request_missing_id_defaults_to_null() {
        let req: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"tasks/get"}"#).unwrap();
        assert_eq!(req.id, JsonRpcId::Null);
        assert!(req.params.is_none());
    }

    #[test]
    fn test_jsonrpc_request_serde() {
        let req = JsonRpcRequest::new(
            JsonRpcId::Number(1),
            METHOD_SEND,
            serde_json::json!({"id": "t1"}),
        );

        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""method":"tasks/send""#));
        assert!(json.contains(r#""jsonrpc":"2.0""#));

        let deserialized: JsonRpcRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.method, "tasks/send");
        assert_eq!(deserialized.id, JsonRpcId::Number(1));
    }

    #[test]
    fn test_jsonrpc_response_success() {
        let resp = JsonRpcResponse::success(JsonRpcId::from("r-1"), serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""result""#));
        assert!(!json.contains(r#""error""#));
    }

    #[test]
    fn test_jsonrpc_response_error() {
        let resp = JsonRpcResponse::error(
            JsonRpcId::Null,
            JsonRpcError::from(AtpErrorCode::MethodNotFound),
        );
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(
            json,
            r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found"},"id":null}"#
        );
    }

    #[test]
    fn test_send_params_from_raw_json() {
        let json = r#"{
            "id": "t1",
            "sessionId": "s1",
            "message": {"role": "user", "parts": [{"type": "text", "text": "hello"}]},
            "historyLength": 2,
            "metadata": {"priority": "high"}
        }"#;
        let params: TaskSendParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.id, "t1");
        assert_eq!(params.session_id.as_deref(), Some("s1"));
        assert_eq!(params.message.text(), "hello");
        assert_eq!(params.history_length, Some(2));
        assert_eq!(params.metadata.unwrap()["priority"], "high");
    }

    #[test]
    fn test_send_params_missing_message_fails() {
        let json = r#"{"id": "t1"}"#;
        assert!(serde_json::from_str::<TaskSendParams>(json).is_err());
    }

    #[test]
    fn test_negative_history_length_rejected() {
        let json = r#"{"id": "t1", "historyLength": -1}"#;
        assert!(serde_json::from_str::<TaskQueryParams>(json).is_err());
    }

    #[test]
    fn test_id_params_carry_metadata() {
        let json = r#"{"id": "t1", "metadata": {"origin": "dashboard"}}"#;
        let params: TaskIdParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.metadata.as_ref().unwrap()["origin"], "dashboard");
        let back = serde_json::to_value(&params).unwrap();
        assert_eq!(back["metadata"]["origin"], "dashboard");

        let json = r#"{"id": "t1", "historyLength": 1, "metadata": {"k": 1}}"#;
        let params: TaskQueryParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.history_length, Some(1));
        assert_eq!(params.metadata.unwrap()["k"], 1);

        let bare = serde_json::to_string(&TaskIdParams::new("t2")).unwrap();
        assert_eq!(bare, r#"{"id":"t2"}"#);
    }

    #[test]
    fn test_error_conversion_keeps_data() {
        let err: JsonRpcError = AtpError::new(AtpErrorCode::InvalidParams, "bad")
            .with_data(serde_json::json!("detail"))
            .into();
        assert_eq!(err.code, -32602);
        assert_eq!(err.data, Some(serde_json::json!("detail")));
        assert_eq!(err.to_string(), "[-32602] bad");
    }
}
