//! Session draining on process termination.

use std::collections::HashSet;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{info, warn};

use crate::config::DEFAULT_CLOSE_TIMEOUT;
use crate::registry::SessionRegistry;
use crate::session::{Session, SessionId};

/// Outcome of draining the registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Sessions that closed cleanly
    pub closed: usize,
    /// Sessions whose close returned an error or panicked
    pub failed: usize,
    /// Sessions whose close did not finish within the timeout
    pub timed_out: usize,
}

impl DrainReport {
    /// Sessions visited
    pub fn total(&self) -> usize {
        self.closed + self.failed + self.timed_out
    }
}

/// Closes every live session and empties the registry
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    registry: Arc<SessionRegistry>,
    close_timeout: Duration,
}

impl ShutdownCoordinator {
    /// Coordinator with the default 5s close timeout
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    /// Set the per-session close timeout
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Close all sessions concurrently, then clear the registry.
    ///
    /// The registry stops accepting sessions first. Sessions that slipped in
    /// while earlier closes were running get a pass of their own, so every
    /// session that was ever live is closed before the registry empties.
    /// A failing or hanging close is logged and never stops the others.
    pub async fn drain(&self) -> DrainReport {
        self.registry.begin_close();

        let mut visited: HashSet<SessionId> = HashSet::new();
        let mut report = DrainReport::default();
        loop {
            let pending: Vec<Arc<Session>> = self
                .registry
                .snapshot()
                .into_iter()
                .filter(|session| !visited.contains(session.id()))
                .collect();
            if pending.is_empty() {
                break;
            }
            info!(sessions = pending.len(), "Closing active sessions");
            visited.extend(pending.iter().map(|session| session.id().clone()));
            self.close_all(&pending, &mut report).await;
        }

        self.registry.clear();
        info!(
            closed = report.closed,
            failed = report.failed,
            timed_out = report.timed_out,
            "Session drain complete"
        );
        report
    }

    async fn close_all(&self, sessions: &[Arc<Session>], report: &mut DrainReport) {
        let close_timeout = self.close_timeout;
        let outcomes = join_all(sessions.iter().map(|session| async move {
            (
                session.id(),
                tokio::time::timeout(close_timeout, session.close()).await,
            )
        }))
        .await;

        for (session_id, outcome) in outcomes {
            match outcome {
                Ok(Ok(())) => report.closed += 1,
                Ok(Err(e)) => {
                    warn!(session_id = %session_id, error = %e, "Session close failed");
                    report.failed += 1;
                }
                Err(_) => {
                    warn!(
                        session_id = %session_id,
                        timeout_ms = close_timeout.as_millis() as u64,
                        "Session close timed out"
                    );
                    report.timed_out += 1;
                }
            }
        }
    }

    /// Wait for `signal`, then drain.
    pub async fn run_until<F>(&self, signal: F) -> DrainReport
    where
        F: Future<Output = ()>,
    {
        signal.await;
        info!("Shutdown signal received");
        self.drain().await
    }
}

/// Resolves on SIGTERM, SIGINT or SIGQUIT (Ctrl+C elsewhere).
///
/// # Errors
///
/// Returns an error if a signal handler cannot be installed.
pub async fn shutdown_signal() -> io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigquit = signal(SignalKind::quit())?;
        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
            _ = sigquit.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    Ok(())
}
