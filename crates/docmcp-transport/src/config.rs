//! Streamable HTTP transport configuration.

use std::time::Duration;

use crate::security::{DeploymentMode, OriginPolicy};

/// Default SSE keep-alive interval
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Default per-session close timeout during shutdown
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default maximum request body size (4 MiB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

/// Configuration for the streamable HTTP router
#[derive(Clone, Debug)]
pub struct StreamableHttpConfig {
    /// Base path for the protocol endpoint (default: "/mcp")
    pub endpoint_path: String,

    /// SSE keep-alive interval
    pub keep_alive: Duration,

    /// Reply with a single JSON object instead of an SSE stream
    pub json_response: bool,

    /// Origin validation policy
    pub origin_policy: OriginPolicy,

    /// Maximum request body size in bytes
    pub max_body_size: usize,

    /// Per-session close timeout used when draining sessions
    pub close_timeout: Duration,
}

impl Default for StreamableHttpConfig {
    fn default() -> Self {
        StreamableHttpConfigBuilder::new().build()
    }
}

/// Builder for [`StreamableHttpConfig`]
///
/// # Examples
///
/// ```rust
/// use docmcp_transport::config::StreamableHttpConfigBuilder;
/// use docmcp_transport::security::DeploymentMode;
///
/// let config = StreamableHttpConfigBuilder::new()
///     .with_endpoint_path("/mcp")
///     .with_mode(DeploymentMode::Production)
///     .with_allowed_origins(["https://app.example.com"])
///     .with_json_response(true)
///     .build();
///
/// assert!(config.origin_policy.mode.is_production());
/// assert!(config.json_response);
/// ```
#[derive(Clone, Debug)]
pub struct StreamableHttpConfigBuilder {
    endpoint_path: String,
    keep_alive: Duration,
    json_response: bool,
    mode: DeploymentMode,
    allowed_origins: Vec<String>,
    max_body_size: usize,
    close_timeout: Duration,
}

impl Default for StreamableHttpConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamableHttpConfigBuilder {
    /// Create a new builder with development defaults
    pub fn new() -> Self {
        Self {
            endpoint_path: "/mcp".to_string(),
            keep_alive: DEFAULT_KEEP_ALIVE,
            json_response: false,
            mode: DeploymentMode::Development,
            allowed_origins: Vec::new(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    /// Set the endpoint path (default: "/mcp")
    pub fn with_endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.endpoint_path = path.into();
        self
    }

    /// Set the SSE keep-alive interval (default: 30s)
    pub fn with_keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = interval;
        self
    }

    /// Reply with JSON objects instead of SSE streams
    pub fn with_json_response(mut self, enabled: bool) -> Self {
        self.json_response = enabled;
        self
    }

    /// Set the deployment mode (default: development)
    pub fn with_mode(mut self, mode: DeploymentMode) -> Self {
        self.mode = mode;
        self
    }

    /// Add allowed origins (consulted in production mode only)
    pub fn with_allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_origins
            .extend(origins.into_iter().map(Into::into));
        self
    }

    /// Set the maximum request body size (default: 4 MiB)
    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// Set the per-session close timeout (default: 5s)
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Build the configuration
    pub fn build(self) -> StreamableHttpConfig {
        let mut endpoint_path = self.endpoint_path;
        if !endpoint_path.starts_with('/') {
            endpoint_path.insert(0, '/');
        }

        StreamableHttpConfig {
            endpoint_path,
            keep_alive: self.keep_alive,
            json_response: self.json_response,
            origin_policy: OriginPolicy::new(self.mode).with_allowed_origins(self.allowed_origins),
            max_body_size: self.max_body_size,
            close_timeout: self.close_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StreamableHttpConfig::default();
        assert_eq!(config.endpoint_path, "/mcp");
        assert_eq!(config.keep_alive, DEFAULT_KEEP_ALIVE);
        assert_eq!(config.close_timeout, DEFAULT_CLOSE_TIMEOUT);
        assert!(!config.json_response);
        assert_eq!(config.origin_policy.mode, DeploymentMode::Development);
    }

    #[test]
    fn test_endpoint_path_normalized() {
        let config = StreamableHttpConfigBuilder::new()
            .with_endpoint_path("rpc")
            .build();
        assert_eq!(config.endpoint_path, "/rpc");
    }
}
