//! Unified gateway error handling.
//!
//! A single [`McpError`] type is shared by the handler core, the stdio
//! front-end and the streamable HTTP transport. Each [`ErrorKind`] maps to a
//! JSON-RPC error code so that every failure can be rendered on the wire
//! without a second translation table.
//!
//! ## Example
//!
//! ```rust
//! use docmcp_protocol::error::{ErrorKind, McpError, McpResult};
//!
//! fn lookup(name: &str) -> McpResult<()> {
//!     Err(McpError::tool_not_found(name))
//! }
//!
//! let err = lookup("calculator").unwrap_err();
//! assert_eq!(err.kind, ErrorKind::ToolNotFound);
//! assert_eq!(err.jsonrpc_code(), -32001);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type alias for gateway operations
pub type McpResult<T> = Result<T, McpError>;

/// JSON-RPC code for implementation-defined server errors (session, header
/// validation and other transport-level rejections).
pub const SERVER_ERROR_CODE: i32 = -32000;

/// JSON-RPC code for internal errors.
pub const INTERNAL_ERROR_CODE: i32 = -32603;

/// Gateway error: a kind plus the message sent to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpError {
    /// Error classification
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
}

/// What went wrong, and therefore which JSON-RPC code goes on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Tool not found (MCP -32001)
    ToolNotFound,
    /// Resource not found (MCP -32004)
    ResourceNotFound,

    /// Parse error (-32700)
    ParseError,
    /// Invalid request (-32600)
    InvalidRequest,
    /// Method not found (-32601)
    MethodNotFound,
    /// Invalid params (-32602)
    InvalidParams,

    /// Transport-level failure (-32000)
    Transport,
}

impl ErrorKind {
    /// JSON-RPC error code for this kind
    pub const fn jsonrpc_code(self) -> i32 {
        match self {
            Self::ToolNotFound => -32001,
            Self::ResourceNotFound => -32004,
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::Transport => SERVER_ERROR_CODE,
        }
    }
}

impl McpError {
    /// Error of `kind` carrying `message` verbatim
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Unparseable JSON (`-32700`)
    #[must_use]
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseError, message)
    }

    /// Well-formed JSON that is not a usable request (`-32600`)
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    /// No route for `method` (`-32601`)
    #[must_use]
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::MethodNotFound,
            format!("Method not found: {}", method.into()),
        )
    }

    /// Missing or malformed `params` (`-32602`)
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParams, message)
    }

    /// `tools/call` named a tool this gateway does not expose
    #[must_use]
    pub fn tool_not_found(tool_name: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::ToolNotFound,
            format!("Tool not found: {}", tool_name.into()),
        )
    }

    /// `resources/read` named an unknown URI
    #[must_use]
    pub fn resource_not_found(uri: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::ResourceNotFound,
            format!("Resource not found: {}", uri.into()),
        )
    }

    /// Front-end I/O failure
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// JSON-RPC error code for this error
    pub const fn jsonrpc_code(&self) -> i32 {
        self.kind.jsonrpc_code()
    }
}

impl fmt::Display for McpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for McpError {}

impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse_error(err.to_string())
    }
}
