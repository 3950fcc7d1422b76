//! Retrieval backend client.
//!
//! - `POST <backend>/chat {message, contexts}` → `{contexts: [...]}`
//! - `GET <backend>/instructions` → `{systemInstructions, preamble, europeanEconomicAreaTermsDisclaimer}`
//!
//! The infallible `search`/`instructions` methods never surface backend
//! failures: they log and return [`NO_INFORMATION`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Text returned when the backend cannot answer
pub const NO_INFORMATION: &str = "No information available";

/// Retrieval backend errors
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Network or decoding failure
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status
    #[error("backend returned status {0}")]
    Status(u16),

    /// Nothing usable in the response
    #[error("backend returned no content")]
    Empty,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    contexts: &'a [String],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    contexts: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstructionsResponse {
    system_instructions: Option<String>,
    preamble: Option<String>,
    european_economic_area_terms_disclaimer: Option<String>,
}

/// HTTP client for the retrieval backend
#[derive(Debug, Clone)]
pub struct RetrievalClient {
    http: reqwest::Client,
    base_url: String,
}

impl RetrievalClient {
    /// Client for `base_url` with a per-request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RetrievalError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Backend base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query the backend for documentation snippets.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, non-success status, or when the
    /// backend returns no contexts.
    pub async fn try_search(&self, query: &str, contexts: &[String]) -> Result<String, RetrievalError> {
        let url = format!("{}/chat", self.base_url);
        debug!(%url, "Querying retrieval backend");

        let response = self
            .http
            .post(&url)
            .json(&ChatRequest {
                message: query,
                contexts,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Status(status.as_u16()));
        }

        let body: ChatResponse = response.json().await?;
        let text = body
            .contexts
            .iter()
            .map(render_context)
            .filter(|snippet| !snippet.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        if text.is_empty() {
            Err(RetrievalError::Empty)
        } else {
            Ok(text)
        }
    }

    /// Like [`RetrievalClient::try_search`], with failures degraded to
    /// [`NO_INFORMATION`].
    pub async fn search(&self, query: &str, contexts: &[String]) -> String {
        self.try_search(query, contexts)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Documentation search failed");
                NO_INFORMATION.to_string()
            })
    }

    /// Fetch the usage instructions.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, non-success status, or when
    /// every field is empty.
    pub async fn try_instructions(&self) -> Result<String, RetrievalError> {
        let url = format!("{}/instructions", self.base_url);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Status(status.as_u16()));
        }

        let body: InstructionsResponse = response.json().await?;
        let text = [
            body.preamble,
            body.system_instructions,
            body.european_economic_area_terms_disclaimer,
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

        if text.is_empty() {
            Err(RetrievalError::Empty)
        } else {
            Ok(text)
        }
    }

    /// Like [`RetrievalClient::try_instructions`], with failures degraded to
    /// [`NO_INFORMATION`].
    pub async fn instructions(&self) -> String {
        self.try_instructions().await.unwrap_or_else(|e| {
            warn!(error = %e, "Fetching instructions failed");
            NO_INFORMATION.to_string()
        })
    }
}

/// Strings pass through; objects contribute their `text` or `content`.
fn render_context(context: &Value) -> String {
    match context {
        Value::String(text) => text.clone(),
        Value::Object(map) => map
            .get("text")
            .or_else(|| map.get("content"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| context.to_string()),
        other => other.to_string(),
    }
}
