//! Logging initialization
//!
//! Logs never go to stdout: the stdio front-end uses stdout as its protocol
//! channel.
//!
//! | Output | Guard required |
//! |--------|----------------|
//! | `Stderr` | No |
//! | `File` | **Yes**, buffered logs are flushed when it drops |
//! | `None` | No |
//!
//! ```rust,no_run
//! use docmcp_server::config::LoggingConfig;
//!
//! let _guard = LoggingConfig::file("/var/log/docmcp").init()?;
//! # Ok::<(), std::io::Error>(())
//! ```

use std::io;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogOutput, LoggingConfig};

/// Flushes file logs on drop; hold it for the life of the process
#[derive(Debug)]
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

impl LoggingConfig {
    /// Install the global subscriber.
    ///
    /// `RUST_LOG` overrides the configured level.
    ///
    /// # Errors
    ///
    /// Returns an error if file output has no directory, the directory
    /// cannot be created, or a global subscriber is already installed.
    pub fn init(&self) -> io::Result<Option<LoggingGuard>> {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.output {
            LogOutput::None => Ok(None),
            LogOutput::Stderr => {
                init_stderr(self, filter)?;
                Ok(None)
            }
            LogOutput::File => {
                let dir = self.directory.as_ref().ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "File logging requires a directory",
                    )
                })?;
                init_file(self, dir, filter).map(Some)
            }
        }
    }
}

fn init_stderr(config: &LoggingConfig, filter: EnvFilter) -> io::Result<()> {
    let subscriber = tracing_subscriber::registry().with(filter);

    if config.structured {
        subscriber
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string()))
    } else {
        subscriber
            .with(fmt::layer().with_writer(io::stderr))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string()))
    }
}

fn init_file(
    config: &LoggingConfig,
    dir: &std::path::Path,
    filter: EnvFilter,
) -> io::Result<LoggingGuard> {
    std::fs::create_dir_all(dir)?;

    let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let subscriber = tracing_subscriber::registry().with(filter);

    if config.structured {
        subscriber
            .with(fmt::layer().json().with_writer(non_blocking))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string()))?;
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .try_init()
            .map_err(|e| io::Error::other(e.to_string()))?;
    }

    Ok(LoggingGuard { _file_guard: guard })
}
