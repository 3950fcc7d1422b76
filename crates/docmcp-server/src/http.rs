//! Streamable HTTP front-end.
//!
//! Binds a listener (with port fallback), mounts the streamable router and
//! serves until the shutdown signal resolves. On shutdown every live session
//! is closed before the server stops accepting, so open SSE streams end and
//! axum's graceful shutdown can complete.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use docmcp_protocol::JsonRpcHandler;
use docmcp_transport::{
    AcquiredListener, DrainReport, ListenerError, ListenerOptions, SessionRegistry,
    ShutdownCoordinator, StreamableFactory, StreamableHttpConfig, acquire, create_router,
};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::config::ServerConfig;

/// HTTP front-end errors
#[derive(Error, Debug)]
pub enum HttpServerError {
    /// No listener could be bound
    #[error(transparent)]
    Listener(#[from] ListenerError),

    /// The server loop failed
    #[error("HTTP server error: {0}")]
    Io(#[from] io::Error),
}

/// Unbound HTTP front-end
#[derive(Clone)]
pub struct HttpServer {
    handler: Arc<dyn JsonRpcHandler>,
    http: StreamableHttpConfig,
    listener: ListenerOptions,
}

impl std::fmt::Debug for HttpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServer")
            .field("http", &self.http)
            .field("listener", &self.listener)
            .finish_non_exhaustive()
    }
}

impl HttpServer {
    /// Front-end for `handler` configured from `config`
    pub fn new(handler: Arc<dyn JsonRpcHandler>, config: &ServerConfig) -> Self {
        Self {
            handler,
            http: config.http_config(),
            listener: config.listener_options(),
        }
    }

    /// Replace the listener options
    pub fn with_listener_options(mut self, options: ListenerOptions) -> Self {
        self.listener = options;
        self
    }

    /// Acquire the listener.
    ///
    /// # Errors
    ///
    /// Returns an error when no port can be bound and the fatal-bind policy
    /// returns instead of exiting.
    pub async fn bind(self) -> Result<BoundHttpServer, HttpServerError> {
        let acquired = acquire(&self.listener).await?;
        let local_addr = acquired.local_addr()?;

        if acquired.fell_back() {
            warn!(
                requested = acquired.requested_port,
                port = acquired.port,
                "Preferred port unavailable"
            );
        }

        Ok(BoundHttpServer {
            handler: self.handler,
            http: self.http,
            acquired,
            local_addr,
        })
    }

    /// Bind, then serve until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// See [`HttpServer::bind`] and [`BoundHttpServer::serve`].
    pub async fn serve<F>(self, shutdown: F) -> Result<DrainReport, HttpServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.bind().await?.serve(shutdown).await
    }
}

/// HTTP front-end holding a bound listener
pub struct BoundHttpServer {
    handler: Arc<dyn JsonRpcHandler>,
    http: StreamableHttpConfig,
    acquired: AcquiredListener,
    local_addr: SocketAddr,
}

impl std::fmt::Debug for BoundHttpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundHttpServer")
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

impl BoundHttpServer {
    /// Address actually bound
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until `shutdown` resolves, then drain sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the accept loop fails.
    pub async fn serve<F>(self, shutdown: F) -> Result<DrainReport, HttpServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let registry = Arc::new(SessionRegistry::new());
        let factory = Arc::new(StreamableFactory::new(
            Arc::clone(&self.handler),
            self.http.json_response,
        ));
        let coordinator = ShutdownCoordinator::new(Arc::clone(&registry))
            .with_close_timeout(self.http.close_timeout);

        let endpoint = self.http.endpoint_path.clone();
        let app = create_router(self.http, registry, factory);

        info!(
            "docmcp listening on http://{}{} (health: /health)",
            self.local_addr, endpoint
        );

        let (report_tx, report_rx) = oneshot::channel();
        let drain = async move {
            let report = coordinator.run_until(shutdown).await;
            let _ = report_tx.send(report);
        };

        axum::serve(self.acquired.listener, app)
            .with_graceful_shutdown(drain)
            .await?;

        let report = report_rx.await.unwrap_or_default();
        info!(sessions = report.total(), "HTTP server stopped");
        Ok(report)
    }
}
