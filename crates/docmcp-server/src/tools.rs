//! Tool and resource catalog.

use docmcp_protocol::{McpError, McpResult};
use serde::Deserialize;
use serde_json::{Value, json};

/// Documentation search tool name
pub const SEARCH_TOOL: &str = "search_documentation";

/// Usage instructions resource URI
pub const INSTRUCTIONS_URI: &str = "docs://instructions";

/// Tool definitions for `tools/list`
pub fn tool_definitions() -> Value {
    json!([
        {
            "name": SEARCH_TOOL,
            "description": "Search the product documentation and return the most relevant passages.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to look up"
                    },
                    "contexts": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Earlier passages to refine the search"
                    }
                },
                "required": ["query"]
            }
        }
    ])
}

/// Resource definitions for `resources/list`
pub fn resource_definitions() -> Value {
    json!([
        {
            "uri": INSTRUCTIONS_URI,
            "name": "instructions",
            "description": "How to use the documentation search tool",
            "mimeType": "text/plain"
        }
    ])
}

/// Arguments of [`SEARCH_TOOL`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchArguments {
    /// Search text
    pub query: String,
    /// Prior contexts
    #[serde(default)]
    pub contexts: Vec<String>,
}

impl SearchArguments {
    /// Parse and validate tool arguments
    ///
    /// # Errors
    ///
    /// Returns an invalid-params error if arguments are missing, malformed,
    /// or the query is blank.
    pub fn parse(arguments: Option<Value>) -> McpResult<Self> {
        let arguments = arguments
            .ok_or_else(|| McpError::invalid_params("Missing arguments for search_documentation"))?;
        let parsed: Self = serde_json::from_value(arguments)
            .map_err(|e| McpError::invalid_params(format!("Invalid arguments: {}", e)))?;
        if parsed.query.trim().is_empty() {
            return Err(McpError::invalid_params("query must not be empty"));
        }
        Ok(parsed)
    }
}

/// `tools/call` result carrying one text block
pub fn text_result(text: impl Into<String>) -> Value {
    json!({
        "content": [{"type": "text", "text": text.into()}],
        "isError": false
    })
}

/// `resources/read` result carrying one text resource
pub fn resource_result(uri: &str, text: impl Into<String>) -> Value {
    json!({
        "contents": [{"uri": uri, "mimeType": "text/plain", "text": text.into()}]
    })
}
