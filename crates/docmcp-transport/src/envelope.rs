//! JSON-RPC error envelope for every HTTP rejection.
//!
//! ```json
//! {"jsonrpc":"2.0","error":{"code":-32000,"message":"...","data":{"code":"SESSION_NOT_FOUND"}},"id":null}
//! ```

use axum::Json;
use axum::response::{IntoResponse, Response};
use docmcp_protocol::{
    ErrorKind, INTERNAL_ERROR_CODE, JsonRpcError, JsonRpcResponse, SERVER_ERROR_CODE,
};
use http::StatusCode;
use serde_json::json;

use crate::security::SecurityError;
use crate::transport::TransportError;

/// An HTTP error rendered as a JSON-RPC error with `id: null`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEnvelope {
    /// HTTP status
    pub status: StatusCode,
    /// JSON-RPC error code
    pub code: i32,
    /// Human-readable message
    pub message: String,
    /// Structured code placed in `error.data.code`
    pub data_code: &'static str,
}

impl ErrorEnvelope {
    /// Create an envelope
    pub fn new(
        status: StatusCode,
        code: i32,
        message: impl Into<String>,
        data_code: &'static str,
    ) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            data_code,
        }
    }

    /// `400` / `BAD_REQUEST`
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            SERVER_ERROR_CODE,
            message,
            "BAD_REQUEST",
        )
    }

    /// `404` / `SESSION_NOT_FOUND`
    pub fn session_not_found() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            SERVER_ERROR_CODE,
            "Session not found",
            "SESSION_NOT_FOUND",
        )
    }

    /// `400` / `PARSE_ERROR`
    pub fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorKind::ParseError.jsonrpc_code(),
            format!("Parse error: {}", detail),
            "PARSE_ERROR",
        )
    }

    /// `413` / `PAYLOAD_TOO_LARGE`
    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::InvalidRequest.jsonrpc_code(),
            format!("Request body exceeds {} bytes", limit),
            "PAYLOAD_TOO_LARGE",
        )
    }

    /// `405` / `METHOD_NOT_ALLOWED`
    pub fn method_not_allowed() -> Self {
        Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            SERVER_ERROR_CODE,
            "Method not allowed",
            "METHOD_NOT_ALLOWED",
        )
    }

    /// `404` / `NOT_FOUND`
    pub fn not_found() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            SERVER_ERROR_CODE,
            "Not found",
            "NOT_FOUND",
        )
    }

    /// `500` / `INTERNAL_ERROR`
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            INTERNAL_ERROR_CODE,
            "Internal server error",
            "INTERNAL_ERROR",
        )
    }

    /// The JSON-RPC body
    pub fn body(&self) -> JsonRpcResponse {
        JsonRpcResponse::error(
            None,
            JsonRpcError {
                code: self.code,
                message: self.message.clone(),
                data: Some(json!({ "code": self.data_code })),
            },
        )
    }
}

impl From<&SecurityError> for ErrorEnvelope {
    fn from(err: &SecurityError) -> Self {
        let status =
            StatusCode::from_u16(err.to_http_status()).unwrap_or(StatusCode::BAD_REQUEST);
        Self::new(status, SERVER_ERROR_CODE, err.to_string(), err.error_code())
    }
}

impl From<&TransportError> for ErrorEnvelope {
    fn from(err: &TransportError) -> Self {
        match err {
            TransportError::Dispatch(_) => Self::internal(),
            other => Self::new(
                other.to_http_status(),
                other.jsonrpc_code(),
                other.to_string(),
                other.error_code(),
            ),
        }
    }
}

impl IntoResponse for ErrorEnvelope {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}
