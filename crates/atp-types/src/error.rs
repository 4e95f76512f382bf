use serde::{Deserialize, Serialize};

/// ATP JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtpErrorCode {
    // Standard JSON-RPC errors
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,

    // Task errors
    TaskNotFound,
    TaskNotCancelable,
}

impl AtpErrorCode {
    pub fn code(&self) -> i32 {
        match self {
            AtpErrorCode::ParseError => -32700,
            AtpErrorCode::InvalidRequest => -32600,
            AtpErrorCode::MethodNotFound => -32601,
            AtpErrorCode::InvalidParams => -32602,
            AtpErrorCode::InternalError => -32603,
            AtpErrorCode::TaskNotFound => -32001,
            AtpErrorCode::TaskNotCancelable => -32002,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            AtpErrorCode::ParseError => "Parse error",
            AtpErrorCode::InvalidRequest => "Invalid Request",
            AtpErrorCode::MethodNotFound => "Method not found",
            AtpErrorCode::InvalidParams => "Invalid params",
            AtpErrorCode::InternalError => "Internal error",
            AtpErrorCode::TaskNotFound => "Task not found",
            AtpErrorCode::TaskNotCancelable => "Task cannot be canceled",
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -32700 => Some(AtpErrorCode::ParseError),
            -32600 => Some(AtpErrorCode::InvalidRequest),
            -32601 => Some(AtpErrorCode::MethodNotFound),
            -32602 => Some(AtpErrorCode::InvalidParams),
            -32603 => Some(AtpErrorCode::InternalError),
            -32001 => Some(AtpErrorCode::TaskNotFound),
            -32002 => Some(AtpErrorCode::TaskNotCancelable),
            _ => None,
        }
    }
}

/// Error object carried in JSON-RPC error responses and SSE error events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtpError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl AtpError {
    pub fn new(code: AtpErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn error_code(&self) -> Option<AtpErrorCode> {
        AtpErrorCode::from_code(self.code)
    }
}

impl From<AtpErrorCode> for AtpError {
    fn from(code: AtpErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.default_message().into(),
            data: None,
        }
    }
}

impl std::fmt::Display for AtpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AtpError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AtpErrorCode::ParseError.code(), -32700);
        assert_eq!(AtpErrorCode::InternalError.code(), -32603);
        assert_eq!(AtpErrorCode::TaskNotFound.code(), -32001);
        assert_eq!(AtpErrorCode::TaskNotCancelable.code(), -32002);
    }

    #[test]
    fn test_all_error_codes_roundtrip() {
        let codes = [
            AtpErrorCode::ParseError,
            AtpErrorCode::InvalidRequest,
            AtpErrorCode::MethodNotFound,
            AtpErrorCode::InvalidParams,
            AtpErrorCode::InternalError,
            AtpErrorCode::TaskNotFound,
            AtpErrorCode::TaskNotCancelable,
        ];

        for code in codes {
            let numeric = code.code();
            assert_eq!(
                AtpErrorCode::from_code(numeric),
                Some(code),
                "Round-trip failed for code {numeric}"
            );
            assert!(!code.default_message().is_empty());
        }
        assert_eq!(AtpErrorCode::from_code(-32003), None);
    }

    #[test]
    fn test_atp_error_from_code() {
        let err = AtpError::from(AtpErrorCode::TaskNotCancelable);
        assert_eq!(err.code, -32002);
        assert_eq!(err.message, "Task cannot be canceled");
    }

    #[test]
    fn test_atp_error_no_data_omitted_in_json() {
        let err = AtpError::new(AtpErrorCode::TaskNotFound, "Task not found");
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"code":-32001,"message":"Task not found"}"#);
    }

    #[test]
    fn test_atp_error_with_data() {
        let err = AtpError::new(AtpErrorCode::InvalidParams, "Invalid params")
            .with_data(serde_json::json!({"field": "message"}));

        let json = serde_json::to_string(&err).unwrap();
        let deserialized: AtpError = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.data.unwrap()["field"], "message");
        assert_eq!(deserialized.code, -32602);
    }

    #[test]
    fn test_atp_error_display() {
        let err = AtpError::new(AtpErrorCode::TaskNotFound, "Task xyz not found");
        assert_eq!(format!("{err}"), "[-32001] Task xyz not found");
    }

    #[test]
    fn test_error_code_method_unknown() {
        let err = AtpError {
            code: -1,
            message: "custom".into(),
            data: None,
        };
        assert_eq!(err.error_code(), None);
    }
}
