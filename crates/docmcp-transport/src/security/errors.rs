//! Header validation error types
//!
//! Every rejection carries an HTTP status and a stable structured code that
//! clients can branch on (`data.code` in the JSON-RPC error envelope).

use thiserror::Error;

/// Header validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    /// Origin header validation failed
    #[error("Origin header validation failed: {0}")]
    InvalidOrigin(String),

    /// Accept header does not allow both JSON and event-stream replies
    #[error("Not Acceptable: {0}")]
    InvalidAccept(String),
}

impl SecurityError {
    /// Convert security error to HTTP status code
    pub fn to_http_status(&self) -> u16 {
        match self {
            SecurityError::InvalidOrigin(_) => 403, // Forbidden
            SecurityError::InvalidAccept(_) => 406, // Not Acceptable
        }
    }

    /// Structured error code reported in the envelope's `data.code`
    pub fn error_code(&self) -> &'static str {
        match self {
            SecurityError::InvalidOrigin(_) => "INVALID_ORIGIN",
            SecurityError::InvalidAccept(_) => "INVALID_ACCEPT_HEADER",
        }
    }
}
