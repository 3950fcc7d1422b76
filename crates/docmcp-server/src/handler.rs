//! Tool-dispatch core shared by both front-ends.
//!
//! [`DocsHandler`] implements the MCP methods the gateway serves:
//!
//! | Method | Result |
//! |--------|--------|
//! | `initialize` | negotiated version, capabilities, server info |
//! | `ping` | `{}` |
//! | `tools/list`, `tools/call` | documentation search |
//! | `resources/list`, `resources/read` | usage instructions |
//!
//! Notifications produce no response. Unknown methods yield -32601.

use docmcp_protocol::{
    HandlerFuture, JsonRpcHandler, JsonRpcRequest, JsonRpcResponse, LATEST_PROTOCOL_VERSION,
    McpError, McpResult, SUPPORTED_PROTOCOL_VERSIONS,
};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::retrieval::RetrievalClient;
use crate::tools::{self, INSTRUCTIONS_URI, SEARCH_TOOL, SearchArguments};

/// Documentation gateway handler
#[derive(Debug, Clone)]
pub struct DocsHandler {
    retrieval: RetrievalClient,
}

impl DocsHandler {
    /// Handler backed by `retrieval`
    pub fn new(retrieval: RetrievalClient) -> Self {
        Self { retrieval }
    }

    async fn dispatch(&self, message: Value) -> Option<Value> {
        let request: JsonRpcRequest = match serde_json::from_value(message) {
            Ok(request) => request,
            Err(e) => {
                return Some(
                    JsonRpcResponse::error(None, McpError::invalid_request(e.to_string()))
                        .into_value(),
                );
            }
        };

        if request.is_notification() {
            debug!(method = %request.method, "Notification received");
            return None;
        }

        let id = request.id.clone();
        let response = match self.route(&request.method, request.params).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                debug!(method = %request.method, error = %e, "Request failed");
                JsonRpcResponse::error(id, e)
            }
        };
        Some(response.into_value())
    }

    async fn route(&self, method: &str, params: Option<Value>) -> McpResult<Value> {
        match method {
            "initialize" => Ok(self.initialize(params.as_ref())),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tools::tool_definitions() })),
            "tools/call" => self.call_tool(params).await,
            "resources/list" => Ok(json!({ "resources": tools::resource_definitions() })),
            "resources/read" => self.read_resource(params).await,
            other => Err(McpError::method_not_found(other)),
        }
    }

    fn initialize(&self, params: Option<&Value>) -> Value {
        let requested = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str);

        let negotiated = requested
            .and_then(|v| SUPPORTED_PROTOCOL_VERSIONS.iter().find(|s| **s == v))
            .copied()
            .unwrap_or(LATEST_PROTOCOL_VERSION);

        if let Some(requested) = requested
            && requested != negotiated
        {
            warn!(requested, negotiated, "Unsupported protocol version requested");
        }

        let info = self.server_info();
        json!({
            "protocolVersion": negotiated,
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": { "subscribe": false, "listChanged": false }
            },
            "serverInfo": { "name": info.name, "version": info.version }
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> McpResult<Value> {
        let params = params.unwrap_or_default();
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_params("Missing tool name"))?;

        if name != SEARCH_TOOL {
            return Err(McpError::tool_not_found(name));
        }

        let args = SearchArguments::parse(params.get("arguments").cloned())?;
        let text = self.retrieval.search(&args.query, &args.contexts).await;
        Ok(tools::text_result(text))
    }

    async fn read_resource(&self, params: Option<Value>) -> McpResult<Value> {
        let uri = params
            .as_ref()
            .and_then(|p| p.get("uri"))
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_params("Missing resource uri"))?;

        if uri != INSTRUCTIONS_URI {
            return Err(McpError::resource_not_found(uri));
        }

        let text = self.retrieval.instructions().await;
        Ok(tools::resource_result(uri, text))
    }
}

impl JsonRpcHandler for DocsHandler {
    fn handle_request(&self, request: Value) -> HandlerFuture<'_> {
        Box::pin(self.dispatch(request))
    }
}
