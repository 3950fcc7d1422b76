//! Origin header validation for DNS rebinding protection
//!
//! Browsers attach an `Origin` header to cross-site requests; a missing
//! header means a server-to-server caller, which is always permitted.
//! Development deployments accept any localhost origin, production
//! deployments accept only origins listed verbatim in the allow-list.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::SecurityError;

const LOCALHOST_PREFIXES: [&str; 2] = ["http://localhost", "https://localhost"];

/// Deployment mode of the gateway
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Exact allow-list matching
    Production,
    /// Localhost origins only
    #[default]
    Development,
}

impl DeploymentMode {
    /// Whether this is the production mode
    pub fn is_production(self) -> bool {
        matches!(self, DeploymentMode::Production)
    }
}

impl FromStr for DeploymentMode {
    type Err = String;

    /// Anything other than `production` (case-insensitive) is development.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("production") {
            Ok(DeploymentMode::Production)
        } else {
            Ok(DeploymentMode::Development)
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentMode::Production => f.write_str("production"),
            DeploymentMode::Development => f.write_str("development"),
        }
    }
}

/// Origin validation policy
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OriginPolicy {
    /// Deployment mode
    pub mode: DeploymentMode,
    /// Allowed origins (production only, exact string match)
    pub allowed_origins: HashSet<String>,
}

impl OriginPolicy {
    /// Create a policy for the given mode with an empty allow-list
    pub fn new(mode: DeploymentMode) -> Self {
        Self {
            mode,
            allowed_origins: HashSet::new(),
        }
    }

    /// Add allowed origins
    pub fn with_allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_origins
            .extend(origins.into_iter().map(Into::into));
        self
    }

    /// Parse a comma-separated allow-list (`"https://a.com, https://b.com"`).
    ///
    /// Entries are trimmed and empty entries are dropped.
    pub fn parse_allow_list(list: &str) -> HashSet<String> {
        list.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Validate the `Origin` header.
///
/// - No header: valid (server-to-server calls).
/// - Development: valid iff the origin starts with `http://localhost` or
///   `https://localhost`.
/// - Production: valid iff the origin is an exact member of the allow-list.
pub fn validate_origin(policy: &OriginPolicy, origin: Option<&str>) -> Result<(), SecurityError> {
    let Some(origin) = origin else {
        return Ok(());
    };

    let allowed = if policy.mode.is_production() {
        policy.allowed_origins.contains(origin)
    } else {
        LOCALHOST_PREFIXES
            .iter()
            .any(|prefix| origin.starts_with(prefix))
    };

    if allowed {
        Ok(())
    } else {
        Err(SecurityError::InvalidOrigin(format!(
            "Origin '{}' not allowed",
            origin
        )))
    }
}
