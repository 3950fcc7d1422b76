//! Handler trait shared by every front-end.
//!
//! Both the stdio adapter and the streamable HTTP transport are built from
//! the same [`JsonRpcHandler`]; neither knows which MCP methods exist.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

/// Boxed future returned by [`JsonRpcHandler::handle_request`].
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Option<serde_json::Value>> + Send + 'a>>;

/// Protocol dispatch core.
///
/// Implementations route on the `method` field, validate parameters and
/// produce a JSON-RPC response value. Notifications produce `None`.
pub trait JsonRpcHandler: Send + Sync + 'static {
    /// Handle a JSON-RPC request or notification.
    ///
    /// The request and response are `serde_json::Value` to avoid tight
    /// coupling with protocol types; the transport decides framing.
    fn handle_request(&self, request: serde_json::Value) -> HandlerFuture<'_>;

    /// Server metadata reported during initialization.
    fn server_info(&self) -> ServerInfo {
        ServerInfo {
            name: "docmcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Server metadata information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name
    pub name: String,
    /// Server version
    pub version: String,
}
