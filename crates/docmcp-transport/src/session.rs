//! Session identity and the per-session handle.
//!
//! - `SessionId`: opaque identifier generated when a session initializes
//! - `SessionState`: lifecycle state (`PendingInit` → `Active` → `Closed`)
//! - `Session`: owns one transport handle and is the only thing that calls it

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::transport::{SessionTransport, TransportError, TransportRequest, TransportResponse};

/// Maximum allowed session ID length (256 characters).
///
/// Longer header values are treated as unknown sessions without a lookup.
pub const MAX_SESSION_ID_LEN: usize = 256;

/// Unique identifier for a session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new random session ID (UUID v4, 122 bits of randomness).
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Try to create a session ID from a string with validation.
    ///
    /// Returns `None` if the string is empty or exceeds `MAX_SESSION_ID_LEN`.
    pub fn try_from_string(s: impl Into<String>) -> Option<Self> {
        let string = s.into();
        if string.is_empty() || string.len() > MAX_SESSION_ID_LEN {
            None
        } else {
            Some(Self(string))
        }
    }

    /// Get the session ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Lifecycle state of a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Constructed but not yet registered
    #[default]
    PendingInit,
    /// Registered and accepting requests
    Active,
    /// Closed explicitly, by the transport, or by registry eviction
    Closed,
}

/// One logical client connection.
///
/// The session exclusively owns its transport handle; dispatch and close
/// go through here so a panic inside the transport is contained.
pub struct Session {
    id: SessionId,
    transport: Arc<dyn SessionTransport>,
    state: Mutex<SessionState>,
    created_at: DateTime<Utc>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &*self.state.lock())
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session in `PendingInit` state.
    pub fn new(id: SessionId, transport: Arc<dyn SessionTransport>) -> Self {
        Self {
            id,
            transport,
            state: Mutex::new(SessionState::PendingInit),
            created_at: Utc::now(),
        }
    }

    /// Session identifier
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Creation time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether `other` is the very transport handle owned by this session.
    pub fn owns(&self, other: &Arc<dyn SessionTransport>) -> bool {
        Arc::ptr_eq(&self.transport, other)
    }

    pub(crate) fn mark_active(&self) {
        let mut state = self.state.lock();
        if *state == SessionState::PendingInit {
            *state = SessionState::Active;
        }
    }

    pub(crate) fn mark_closed(&self) {
        *self.state.lock() = SessionState::Closed;
    }

    /// Forward a request to the transport handle.
    ///
    /// A panic inside the transport surfaces as [`TransportError::Dispatch`].
    pub async fn forward(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        dispatch(&self.transport, request).await
    }

    /// Close the transport handle and mark the session closed.
    ///
    /// The state is `Closed` afterwards even if the transport fails to close.
    pub async fn close(&self) -> Result<(), TransportError> {
        let result = std::panic::AssertUnwindSafe(self.transport.close())
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(TransportError::Dispatch("close panicked".to_string())));
        self.mark_closed();
        result
    }
}

/// Dispatch to a transport handle, converting panics into dispatch errors.
pub(crate) async fn dispatch(
    transport: &Arc<dyn SessionTransport>,
    request: TransportRequest,
) -> Result<TransportResponse, TransportError> {
    std::panic::AssertUnwindSafe(transport.handle(request))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "handler panicked".to_string());
            Err(TransportError::Dispatch(reason))
        })
}
