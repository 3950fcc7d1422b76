//! # docmcp-protocol
//!
//! JSON-RPC 2.0 wire types, the unified [`McpError`] type, and the
//! [`JsonRpcHandler`] trait that every docmcp front-end dispatches into.
//!
//! The crate deliberately has no runtime dependencies beyond `serde`; the
//! transport and server crates build on top of it.

#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod handlers;
pub mod jsonrpc;

pub use error::{ErrorKind, INTERNAL_ERROR_CODE, McpError, McpResult, SERVER_ERROR_CODE};
pub use handlers::{HandlerFuture, JsonRpcHandler, ServerInfo};
pub use jsonrpc::{
    INITIALIZE_METHOD, JSONRPC_VERSION, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    MessageKind, classify, is_initialize_request, method_of,
};

/// Protocol versions the gateway can negotiate, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// Latest protocol version, used when a client asks for an unknown one.
pub const LATEST_PROTOCOL_VERSION: &str = SUPPORTED_PROTOCOL_VERSIONS[0];
