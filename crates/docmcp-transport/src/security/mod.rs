//! Header validation for the protocol endpoint
//!
//! Two pure validators run on every request before any session work, in
//! this order (an Origin failure short-circuits):
//!
//! ```text
//! security/
//! ├── errors.rs  # SecurityError with HTTP status + structured code
//! ├── origin.rs  # Origin validation (DNS rebinding protection)
//! └── accept.rs  # Accept negotiation (JSON + event stream)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use docmcp_transport::security::{DeploymentMode, OriginPolicy, validate_request_headers};
//!
//! let policy = OriginPolicy::new(DeploymentMode::Production)
//!     .with_allowed_origins(["https://app.example.com"]);
//!
//! assert!(validate_request_headers(
//!     &policy,
//!     Some("https://app.example.com"),
//!     Some("application/json, text/event-stream"),
//! )
//! .is_ok());
//! ```

pub mod accept;
pub mod errors;
pub mod origin;

pub use accept::{APPLICATION_JSON, TEXT_EVENT_STREAM, accepts, media_types, validate_accept};
pub use errors::SecurityError;
pub use origin::{DeploymentMode, OriginPolicy, validate_origin};

/// Run both header validators: Origin first, then Accept.
pub fn validate_request_headers(
    policy: &OriginPolicy,
    origin: Option<&str>,
    accept: Option<&str>,
) -> Result<(), SecurityError> {
    validate_origin(policy, origin)?;
    validate_accept(accept)
}
