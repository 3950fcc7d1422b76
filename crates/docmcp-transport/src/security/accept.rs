//! Accept header negotiation
//!
//! A streamable endpoint may answer a POST either with a single JSON object
//! or with an event stream, so clients must accept both.

use std::collections::HashSet;

use super::errors::SecurityError;

/// Media type for unary JSON replies
pub const APPLICATION_JSON: &str = "application/json";

/// Media type for Server-Sent Event streams
pub const TEXT_EVENT_STREAM: &str = "text/event-stream";

/// Parse an `Accept` header into its bare media-type tokens.
///
/// Entries are split on `,`, trimmed, and stripped of any `;`-delimited
/// parameters (`q=0.9`, `charset=utf-8`).
pub fn media_types(accept: &str) -> HashSet<&str> {
    accept
        .split(',')
        .map(|entry| entry.split(';').next().unwrap_or_default().trim())
        .filter(|media_type| !media_type.is_empty())
        .collect()
}

/// Whether the `Accept` header lists `media_type`.
pub fn accepts(accept: Option<&str>, media_type: &str) -> bool {
    accept.is_some_and(|value| media_types(value).contains(media_type))
}

/// Validate that the `Accept` header allows both JSON and event-stream replies.
pub fn validate_accept(accept: Option<&str>) -> Result<(), SecurityError> {
    let Some(accept) = accept else {
        return Err(SecurityError::InvalidAccept(
            "Accept header is required".to_string(),
        ));
    };

    let types = media_types(accept);
    if types.contains(APPLICATION_JSON) && types.contains(TEXT_EVENT_STREAM) {
        Ok(())
    } else {
        Err(SecurityError::InvalidAccept(format!(
            "Client must accept both {} and {}",
            APPLICATION_JSON, TEXT_EVENT_STREAM
        )))
    }
}
