//! The per-session transport handle seam.
//!
//! A transport handle performs protocol framing for exactly one logical
//! client connection. The router only needs the narrow capability exposed
//! here: hand it a request, get back a unary reply or an event stream, and
//! close it. Lifecycle notifications flow the other way through
//! [`SessionHooks`], which the handle receives at construction.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use docmcp_protocol::{ErrorKind, INTERNAL_ERROR_CODE, SERVER_ERROR_CODE};
use futures::stream::BoxStream;
use http::StatusCode;
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;

use crate::session::SessionId;

/// Called once when the handle has generated its session id.
pub type ReadyHook = Box<dyn FnOnce(SessionId, Arc<dyn SessionTransport>) + Send + Sync>;

/// Called once when the handle closes, for whatever reason.
pub type ClosedHook = Box<dyn FnOnce(SessionId) + Send + Sync>;

/// What the router asks of a transport handle.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportRequest {
    /// A POSTed JSON-RPC message
    Message(Value),
    /// A GET opening the long-lived server push stream
    OpenStream,
}

/// One event on a server push stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    /// Event id
    pub id: String,
    /// Event type (`message` for JSON-RPC payloads)
    pub event: String,
    /// JSON payload
    pub data: Value,
}

impl StreamEvent {
    /// A `message` event carrying a JSON-RPC payload.
    pub fn message(data: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event: "message".to_string(),
            data,
        }
    }
}

/// Stream of events. An `Err` item means the stream broke after the
/// response started; the connection is abandoned.
pub type EventStream = BoxStream<'static, Result<StreamEvent, TransportError>>;

/// Reply body chosen by the transport handle.
pub enum ReplyBody {
    /// Single JSON object
    Json(Value),
    /// Accepted, no body (notifications and client responses)
    Accepted,
    /// Server-Sent Event stream
    Stream(EventStream),
}

impl fmt::Debug for ReplyBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyBody::Json(value) => f.debug_tuple("Json").field(value).finish(),
            ReplyBody::Accepted => f.write_str("Accepted"),
            ReplyBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Reply from a transport handle.
#[derive(Debug)]
pub struct TransportResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Session id to echo in the response header
    pub session_id: Option<SessionId>,
    /// Body
    pub body: ReplyBody,
}

impl TransportResponse {
    /// `200` with a JSON body
    pub fn json(session_id: Option<SessionId>, value: Value) -> Self {
        Self {
            status: StatusCode::OK,
            session_id,
            body: ReplyBody::Json(value),
        }
    }

    /// `202` without a body
    pub fn accepted(session_id: Option<SessionId>) -> Self {
        Self {
            status: StatusCode::ACCEPTED,
            session_id,
            body: ReplyBody::Accepted,
        }
    }

    /// `200` with an event stream
    pub fn stream(session_id: Option<SessionId>, stream: EventStream) -> Self {
        Self {
            status: StatusCode::OK,
            session_id,
            body: ReplyBody::Stream(stream),
        }
    }
}

/// Transport handle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The handle has been closed
    #[error("Session is closed")]
    Closed,

    /// `initialize` sent to an already-initialized handle
    #[error("Invalid Request: Server already initialized")]
    AlreadyInitialized,

    /// Non-initialize traffic before initialization
    #[error("Bad Request: Server not initialized")]
    NotInitialized,

    /// A second standalone stream was requested
    #[error("Conflict: Only one SSE stream is allowed per session")]
    StreamConflict,

    /// Body is not a JSON-RPC message
    #[error("Invalid Request: {0}")]
    InvalidMessage(String),

    /// The handler failed while dispatching
    #[error("Dispatch failed: {0}")]
    Dispatch(String),
}

impl TransportError {
    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> StatusCode {
        match self {
            TransportError::Closed => StatusCode::NOT_FOUND,
            TransportError::AlreadyInitialized
            | TransportError::NotInitialized
            | TransportError::InvalidMessage(_) => StatusCode::BAD_REQUEST,
            TransportError::StreamConflict => StatusCode::CONFLICT,
            TransportError::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Structured error code reported in the envelope's `data.code`
    pub fn error_code(&self) -> &'static str {
        match self {
            TransportError::Closed => "SESSION_NOT_FOUND",
            TransportError::AlreadyInitialized
            | TransportError::NotInitialized
            | TransportError::InvalidMessage(_) => "BAD_REQUEST",
            TransportError::StreamConflict => "CONFLICT",
            TransportError::Dispatch(_) => "INTERNAL_ERROR",
        }
    }

    /// JSON-RPC error code reported in the envelope
    pub fn jsonrpc_code(&self) -> i32 {
        match self {
            TransportError::AlreadyInitialized | TransportError::InvalidMessage(_) => {
                ErrorKind::InvalidRequest.jsonrpc_code()
            }
            TransportError::Dispatch(_) => INTERNAL_ERROR_CODE,
            _ => SERVER_ERROR_CODE,
        }
    }
}

/// A per-session transport handle.
#[async_trait]
pub trait SessionTransport: Send + Sync + 'static {
    /// Handle one request; the reply shape is the handle's decision.
    async fn handle(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;

    /// Close the handle. Fires the closed hook if it has not fired yet.
    async fn close(&self) -> Result<(), TransportError>;

    /// The session id, once initialized.
    fn session_id(&self) -> Option<SessionId>;
}

/// Constructs transport handles for new sessions.
pub trait TransportFactory: Send + Sync + 'static {
    /// Create a handle wired to `hooks`.
    fn create(&self, hooks: SessionHooks) -> Arc<dyn SessionTransport>;
}

/// Lifecycle observers handed to a transport handle at construction.
///
/// Each hook fires at most once; later calls are no-ops.
#[derive(Default)]
pub struct SessionHooks {
    on_ready: Mutex<Option<ReadyHook>>,
    on_closed: Mutex<Option<ClosedHook>>,
}

impl fmt::Debug for SessionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHooks")
            .field("on_ready", &self.on_ready.lock().is_some())
            .field("on_closed", &self.on_closed.lock().is_some())
            .finish()
    }
}

impl SessionHooks {
    /// Hooks that do nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ready hook
    pub fn on_ready(self, hook: impl FnOnce(SessionId, Arc<dyn SessionTransport>) + Send + Sync + 'static) -> Self {
        *self.on_ready.lock() = Some(Box::new(hook));
        self
    }

    /// Set the closed hook
    pub fn on_closed(self, hook: impl FnOnce(SessionId) + Send + Sync + 'static) -> Self {
        *self.on_closed.lock() = Some(Box::new(hook));
        self
    }

    /// Fire the ready hook. Returns `false` if it already fired.
    pub fn fire_ready(&self, id: SessionId, transport: Arc<dyn SessionTransport>) -> bool {
        let hook = self.on_ready.lock().take();
        match hook {
            Some(hook) => {
                hook(id, transport);
                true
            }
            None => false,
        }
    }

    /// Fire the closed hook. Returns `false` if it already fired.
    pub fn fire_closed(&self, id: SessionId) -> bool {
        let hook = self.on_closed.lock().take();
        match hook {
            Some(hook) => {
                hook(id);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_closed_hook_fires_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let hooks = SessionHooks::new().on_closed(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(hooks.fire_closed(SessionId::new()));
        assert!(!hooks.fire_closed(SessionId::new()));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            TransportError::StreamConflict.to_http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            TransportError::Dispatch("x".into()).error_code(),
            "INTERNAL_ERROR"
        );
        assert_eq!(TransportError::Closed.error_code(), "SESSION_NOT_FOUND");
    }
}
