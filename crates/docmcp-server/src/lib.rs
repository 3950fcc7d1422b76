//! # docmcp-server
//!
//! The documentation gateway: one tool-dispatch core ([`DocsHandler`])
//! served by two independent front-ends.
//!
//! - [`StdioServer`]: newline-delimited JSON-RPC on stdin/stdout, one client
//! - [`HttpServer`]: streamable HTTP with its own session registry
//!
//! The front-ends share tool logic only; they never share session state.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use docmcp_server::{DocsHandler, HttpServer, RetrievalClient, ServerConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::load(None)?;
//! let retrieval = RetrievalClient::new(&config.backend_url, config.backend_timeout())?;
//! let handler = Arc::new(DocsHandler::new(retrieval));
//!
//! let report = HttpServer::new(handler, &config)
//!     .serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//! println!("closed {} sessions", report.closed);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod handler;
pub mod http;
pub mod logging;
pub mod retrieval;
pub mod stdio;
pub mod tools;

pub use config::{ConfigError, LogOutput, LoggingConfig, ServerConfig};
pub use handler::DocsHandler;
pub use http::{BoundHttpServer, HttpServer, HttpServerError};
pub use logging::LoggingGuard;
pub use retrieval::{NO_INFORMATION, RetrievalClient, RetrievalError};
pub use stdio::StdioServer;
