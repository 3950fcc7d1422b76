//! # docmcp-transport
//!
//! Streamable HTTP transport for the docmcp gateway: many concurrent client
//! sessions multiplexed over a single endpoint.
//!
//! ## Module Organization
//!
//! ```text
//! docmcp-transport/
//! ├── security/     # Origin and Accept header validators
//! ├── session.rs    # SessionId, SessionState, Session handle
//! ├── transport.rs  # SessionTransport seam, lifecycle hooks, factory
//! ├── streamable.rs # Streamable per-session transport (JSON or SSE replies)
//! ├── registry.rs   # Concurrent session registry
//! ├── envelope.rs   # JSON-RPC error envelope for HTTP rejections
//! ├── router.rs     # axum router: POST / GET / DELETE + /health
//! ├── listener.rs   # Listener acquisition with port fallback
//! ├── shutdown.rs   # Session drain on termination
//! └── config.rs     # StreamableHttpConfig and builder
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use docmcp_transport::{
//!     SessionRegistry, StreamableFactory, StreamableHttpConfig, create_router,
//!     listener::{ListenerOptions, acquire},
//! };
//! # use docmcp_protocol::{HandlerFuture, JsonRpcHandler};
//! # struct Handler;
//! # impl JsonRpcHandler for Handler {
//! #     fn handle_request(&self, _: serde_json::Value) -> HandlerFuture<'_> { Box::pin(async { None }) }
//! # }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(SessionRegistry::new());
//! let factory = Arc::new(StreamableFactory::new(Arc::new(Handler), false));
//! let app = create_router(StreamableHttpConfig::default(), registry, factory);
//!
//! let acquired = acquire(&ListenerOptions::default()).await?;
//! axum::serve(acquired.listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod envelope;
pub mod listener;
pub mod registry;
pub mod router;
pub mod security;
pub mod session;
pub mod shutdown;
pub mod streamable;
pub mod transport;

pub use config::{StreamableHttpConfig, StreamableHttpConfigBuilder};
pub use envelope::ErrorEnvelope;
pub use listener::{AcquiredListener, FatalBindPolicy, ListenerError, ListenerOptions, acquire};
pub use registry::{RegistryError, SessionRegistry};
pub use router::{AppState, MCP_PROTOCOL_VERSION_HEADER, MCP_SESSION_ID_HEADER, create_router};
pub use session::{Session, SessionId, SessionState};
pub use shutdown::{DrainReport, ShutdownCoordinator, shutdown_signal};
pub use streamable::{StreamableFactory, StreamableSession};
pub use transport::{
    ReplyBody, SessionHooks, SessionTransport, StreamEvent, TransportError, TransportFactory,
    TransportRequest, TransportResponse,
};
