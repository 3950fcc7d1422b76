//! Server configuration management
//!
//! Settings are layered: built-in defaults, then an optional file
//! (`.toml`, `.yaml`/`.yml` or `.json`), then `DOCMCP_*` environment
//! variables. Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use docmcp_transport::listener::{DEFAULT_MAX_PORT_ATTEMPTS, ListenerOptions};
use docmcp_transport::security::DeploymentMode;
use docmcp_transport::{StreamableHttpConfig, StreamableHttpConfigBuilder};
use serde::{Deserialize, Deserializer, Serialize};

/// Default environment variable prefix
pub const ENV_PREFIX: &str = "DOCMCP";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Preferred port
    pub port: u16,
    /// Protocol endpoint path
    pub endpoint_path: String,
    /// Deployment mode (affects Origin validation)
    #[serde(deserialize_with = "lenient_mode")]
    pub mode: DeploymentMode,
    /// Origins accepted in production mode
    pub allowed_origins: Vec<String>,
    /// Retrieval backend base URL
    pub backend_url: String,
    /// Retrieval backend request timeout in seconds
    pub backend_timeout_secs: u64,
    /// Reply with JSON objects instead of SSE streams
    pub json_response: bool,
    /// SSE keep-alive interval in seconds
    pub keep_alive_secs: u64,
    /// Per-session close timeout during shutdown, in seconds
    pub close_timeout_secs: u64,
    /// Total bind attempts before giving up
    pub max_port_attempts: u16,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            endpoint_path: "/mcp".to_string(),
            mode: DeploymentMode::Development,
            allowed_origins: Vec::new(),
            backend_url: "http://localhost:8000".to_string(),
            backend_timeout_secs: 30,
            json_response: false,
            keep_alive_secs: 30,
            close_timeout_secs: 5,
            max_port_attempts: DEFAULT_MAX_PORT_ATTEMPTS,
            logging: LoggingConfig::default(),
        }
    }
}

/// Where log output goes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard error
    #[default]
    Stderr,
    /// Daily-rotated files under `directory`
    File,
    /// Logging disabled
    None,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive (`RUST_LOG` takes precedence)
    pub level: String,
    /// Output target
    pub output: LogOutput,
    /// Log directory for file output
    pub directory: Option<PathBuf>,
    /// Log file name prefix
    pub file_prefix: String,
    /// Emit JSON lines
    pub structured: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: LogOutput::Stderr,
            directory: None,
            file_prefix: "docmcp.log".to_string(),
            structured: false,
        }
    }
}

impl LoggingConfig {
    /// Plain-text logging to stderr at `level`
    pub fn stderr(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }

    /// Logging to rotated files in `directory`
    pub fn file(directory: impl Into<PathBuf>) -> Self {
        Self {
            output: LogOutput::File,
            directory: Some(directory.into()),
            ..Self::default()
        }
    }

    /// No logging
    pub fn disabled() -> Self {
        Self {
            output: LogOutput::None,
            ..Self::default()
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Unsupported file format
    #[error("Unsupported configuration file format (expected .toml, .yaml, .yml or .json)")]
    UnsupportedFormat,

    /// Parse error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] config::ConfigError),
}

impl ServerConfig {
    /// Load configuration from an optional file layered under `DOCMCP_*`
    /// environment variables.
    ///
    /// `DOCMCP_ALLOWED_ORIGINS` is a comma-separated list; nested settings
    /// use `__` (`DOCMCP_LOGGING__LEVEL=debug`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file doesn't exist, has an unsupported
    /// extension, or contains invalid configuration.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// Load configuration with a custom environment prefix
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::load`].
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self, ConfigError> {
        use config::{Config, Environment, File, FileFormat};

        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }

            let format = match path.extension().and_then(|s| s.to_str()) {
                Some("toml") => FileFormat::Toml,
                Some("yaml") | Some("yml") => FileFormat::Yaml,
                Some("json") => FileFormat::Json,
                _ => return Err(ConfigError::UnsupportedFormat),
            };

            builder = builder.add_source(File::new(
                path.to_str().ok_or(ConfigError::UnsupportedFormat)?,
                format,
            ));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_origins"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Retrieval backend timeout
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    /// Transport configuration derived from these settings
    pub fn http_config(&self) -> StreamableHttpConfig {
        StreamableHttpConfigBuilder::new()
            .with_endpoint_path(self.endpoint_path.clone())
            .with_keep_alive(Duration::from_secs(self.keep_alive_secs.max(1)))
            .with_json_response(self.json_response)
            .with_mode(self.mode)
            .with_allowed_origins(self.allowed_origins.iter().map(|o| o.trim().to_string()))
            .with_close_timeout(Duration::from_secs(self.close_timeout_secs))
            .build()
    }

    /// Listener options derived from these settings
    ///
    /// An unparseable host falls back to the loopback interface.
    pub fn listener_options(&self) -> ListenerOptions {
        let host = self.host.parse().unwrap_or_else(|_| {
            tracing::warn!(host = %self.host, "Invalid bind host, using 127.0.0.1");
            std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST)
        });
        ListenerOptions::new(host, self.port).with_max_attempts(self.max_port_attempts)
    }
}

/// Anything other than "production" (any case) is development
fn lenient_mode<'de, D>(deserializer: D) -> Result<DeploymentMode, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.parse().unwrap_or_default())
}
