//! JSON-RPC 2.0 wire types.
//!
//! Requests and responses are kept close to `serde_json::Value` so the
//! transport layer can inspect a body (is it an `initialize`? a
//! notification?) before handing it to a handler, without committing to a
//! typed schema for every MCP method.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::McpError;

/// JSON-RPC protocol version string
pub const JSONRPC_VERSION: &str = "2.0";

/// Method name of the MCP initialization request
pub const INITIALIZE_METHOD: &str = "initialize";

/// JSON-RPC request or notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// Request ID (absent for notifications)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Create a request with an id.
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// Whether this message is a notification (no id, no response expected).
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC response structure.
///
/// `id` is always serialized; error responses to unidentifiable requests
/// carry `"id": null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// Result (mutually exclusive with error)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error (mutually exclusive with result)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Request ID (echoed from request)
    #[serde(default)]
    pub id: Value,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<McpError> for JsonRpcError {
    fn from(err: McpError) -> Self {
        Self {
            code: err.jsonrpc_code(),
            message: err.message,
            data: None,
        }
    }
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id: id.unwrap_or(Value::Null),
        }
    }

    /// Create an error response.
    pub fn error(id: Option<Value>, error: impl Into<JsonRpcError>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error.into()),
            id: id.unwrap_or(Value::Null),
        }
    }

    /// Serialize into a JSON value.
    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Coarse classification of an incoming JSON-RPC body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Has `method` and `id`: expects a response
    Request,
    /// Has `method` but no `id`
    Notification,
    /// Has `result` or `error`: a reply to a server-initiated request
    Response,
    /// Anything else (arrays, scalars, malformed objects)
    Invalid,
}

/// Classify a JSON-RPC body without fully deserializing it.
pub fn classify(message: &Value) -> MessageKind {
    let Some(object) = message.as_object() else {
        return MessageKind::Invalid;
    };
    if object.contains_key("method") {
        if object.get("id").is_some_and(|id| !id.is_null()) {
            MessageKind::Request
        } else {
            MessageKind::Notification
        }
    } else if object.contains_key("result") || object.contains_key("error") {
        MessageKind::Response
    } else {
        MessageKind::Invalid
    }
}

/// Return the `method` field of a JSON-RPC body, if any.
pub fn method_of(message: &Value) -> Option<&str> {
    message.get("method").and_then(Value::as_str)
}

/// Whether the body is an MCP `initialize` request.
///
/// ```rust
/// use docmcp_protocol::jsonrpc::is_initialize_request;
/// use serde_json::json;
///
/// assert!(is_initialize_request(&json!({"jsonrpc": "2.0", "method": "initialize", "id": 1})));
/// assert!(!is_initialize_request(&json!({"jsonrpc": "2.0", "method": "tools/list", "id": 2})));
/// ```
pub fn is_initialize_request(message: &Value) -> bool {
    method_of(message) == Some(INITIALIZE_METHOD) && classify(message) == MessageKind::Request
}
