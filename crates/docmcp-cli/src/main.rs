//! `docmcp` binary

mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use docmcp_server::{DocsHandler, HttpServer, RetrievalClient, ServerConfig, StdioServer};
use docmcp_transport::shutdown_signal;
use tracing::{error, info};

use crate::cli::{Cli, TransportKind};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig::load(cli.config.as_deref()).context("loading configuration")?;
    cli.apply(&mut config);

    let _log_guard = config
        .logging
        .init()
        .context("initializing logging")?;

    let retrieval = RetrievalClient::new(&config.backend_url, config.backend_timeout())
        .context("building retrieval client")?;
    let handler = Arc::new(DocsHandler::new(retrieval));
    info!(
        transport = ?cli.transport,
        backend = %config.backend_url,
        mode = %config.mode,
        "Starting docmcp"
    );

    match cli.transport {
        TransportKind::Stdio => {
            let server = StdioServer::new(handler);
            tokio::select! {
                result = server.run_stdio() => result.context("stdio transport")?,
                () = wait_for_signal() => info!("Shutdown signal received"),
            }
        }
        TransportKind::Http => {
            let report = HttpServer::new(handler, &config)
                .serve(wait_for_signal())
                .await
                .context("HTTP transport")?;
            info!(
                closed = report.closed,
                failed = report.failed,
                timed_out = report.timed_out,
                "Shutdown complete"
            );
        }
    }

    Ok(())
}

/// Resolves on a termination signal. If handlers cannot be installed the
/// process keeps running until killed.
async fn wait_for_signal() {
    if let Err(e) = shutdown_signal().await {
        error!(error = %e, "Failed to install signal handlers");
        std::future::pending::<()>().await;
    }
}
