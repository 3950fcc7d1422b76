//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use docmcp_server::ServerConfig;

/// docmcp gateway command line
#[derive(Parser, Debug)]
#[command(
    name = "docmcp",
    version,
    about = "MCP documentation gateway over stdio or streamable HTTP",
    long_about = "Serves a documentation search tool to MCP clients.\n\
                  Settings are read from an optional config file, then DOCMCP_* \
                  environment variables, then these flags (highest precedence)."
)]
pub struct Cli {
    /// Front-end to serve
    #[arg(long, short = 't', value_enum, default_value = "http")]
    pub transport: TransportKind,

    /// Configuration file (.toml, .yaml, .yml or .json)
    #[arg(long, short = 'c', env = "DOCMCP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Preferred port; higher ports are tried while it is in use
    #[arg(long, short = 'p', env = "PORT")]
    pub port: Option<u16>,

    /// Deployment mode; "production" enforces the origin allow-list
    #[arg(long, env = "DOCMCP_MODE")]
    pub mode: Option<String>,

    /// Origins accepted in production mode (comma separated)
    #[arg(long, env = "DOCMCP_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Option<Vec<String>>,

    /// Retrieval backend base URL
    #[arg(long, env = "DOCMCP_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Reply to requests with a JSON body instead of an SSE stream
    #[arg(long)]
    pub json_response: bool,

    /// Log level or filter directive (RUST_LOG wins)
    #[arg(long, short = 'l')]
    pub log_level: Option<String>,
}

/// Front-end selection
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum TransportKind {
    /// Newline-delimited JSON-RPC on stdin/stdout
    Stdio,
    /// Streamable HTTP
    Http,
}

impl Cli {
    /// Overlay flags on a loaded configuration
    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(mode) = &self.mode {
            config.mode = mode.parse().unwrap_or_default();
        }
        if let Some(origins) = &self.allowed_origins {
            config.allowed_origins = origins
                .iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(url) = &self.backend_url {
            config.backend_url.clone_from(url);
        }
        if self.json_response {
            config.json_response = true;
        }
        if let Some(level) = &self.log_level {
            config.logging.level.clone_from(level);
        }
    }
}
