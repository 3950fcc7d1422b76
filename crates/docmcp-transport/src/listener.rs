//! Listener acquisition with deterministic port fallback.
//!
//! The preferred port is tried first; on `EADDRINUSE` the next port up is
//! tried, for a bounded number of attempts. Any other bind error is fatal
//! and is not retried.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Default total bind attempts (the preferred port plus 10 increments)
pub const DEFAULT_MAX_PORT_ATTEMPTS: u16 = 11;

/// Listener acquisition errors
#[derive(Error, Debug)]
pub enum ListenerError {
    /// Every candidate port was in use
    #[error("could not find an open port after {attempts} attempts (starting at {start})")]
    Exhausted {
        /// Preferred port
        start: u16,
        /// Attempts made
        attempts: u16,
    },

    /// A bind failure other than "address in use"
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that failed
        addr: SocketAddr,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

/// What a fatal bind error does
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FatalBindPolicy {
    /// Log and terminate the process
    #[default]
    Exit,
    /// Return the error to the caller (tests)
    Return,
}

/// Listener acquisition options
#[derive(Debug, Clone)]
pub struct ListenerOptions {
    /// Interface to bind
    pub host: IpAddr,
    /// Preferred port
    pub port: u16,
    /// Total bind attempts
    pub max_attempts: u16,
    /// Fatal error behaviour
    pub fatal: FatalBindPolicy,
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            max_attempts: DEFAULT_MAX_PORT_ATTEMPTS,
            fatal: FatalBindPolicy::Exit,
        }
    }
}

impl ListenerOptions {
    /// Options for `host:port` with default attempts and exit-on-fatal
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            host,
            port,
            ..Self::default()
        }
    }

    /// Set the total bind attempts (at least one is always made)
    pub fn with_max_attempts(mut self, attempts: u16) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the fatal error behaviour
    pub fn with_fatal_policy(mut self, policy: FatalBindPolicy) -> Self {
        self.fatal = policy;
        self
    }
}

/// A bound listener
#[derive(Debug)]
pub struct AcquiredListener {
    /// The bound socket
    pub listener: TcpListener,
    /// Port that was asked for
    pub requested_port: u16,
    /// Port actually bound
    pub port: u16,
}

impl AcquiredListener {
    /// Whether the bound port differs from the preferred one
    pub fn fell_back(&self) -> bool {
        self.port != self.requested_port
    }

    /// Bound address
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// Bind a listener, falling back to higher ports while the address is in use.
///
/// With [`FatalBindPolicy::Exit`] a fatal error is logged and the process
/// exits with status 1; with [`FatalBindPolicy::Return`] it is returned.
///
/// # Errors
///
/// Returns [`ListenerError::Exhausted`] when every candidate port is in use
/// and [`ListenerError::Bind`] for any other bind failure.
pub async fn acquire(options: &ListenerOptions) -> Result<AcquiredListener, ListenerError> {
    match try_acquire(options).await {
        Ok(acquired) => Ok(acquired),
        Err(e) => {
            error!(error = %e, port = options.port, "Listener acquisition failed");
            if options.fatal == FatalBindPolicy::Exit {
                std::process::exit(1);
            }
            Err(e)
        }
    }
}

async fn try_acquire(options: &ListenerOptions) -> Result<AcquiredListener, ListenerError> {
    let attempts = options.max_attempts.max(1);
    let mut made = 0;

    for offset in 0..attempts {
        let Some(port) = options.port.checked_add(offset) else {
            break;
        };
        made += 1;

        let addr = SocketAddr::new(options.host, port);
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                // Port 0 asks the OS for an ephemeral port
                let bound = listener.local_addr().map(|a| a.port()).unwrap_or(port);
                if offset > 0 {
                    info!(requested = options.port, port = bound, "Bound fallback port");
                }
                return Ok(AcquiredListener {
                    listener,
                    requested_port: options.port,
                    port: bound,
                });
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                warn!(port, attempt = made, "Port in use, trying next");
            }
            Err(source) => return Err(ListenerError::Bind { addr, source }),
        }
    }

    Err(ListenerError::Exhausted {
        start: options.port,
        attempts: made,
    })
}
