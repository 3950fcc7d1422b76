//! Live session registry.
//!
//! Maps session ids to their [`Session`]. The registry is the single source
//! of truth for "is this session id live" and is passed explicitly to the
//! router and the shutdown coordinator.
//!
//! Once shutdown begins the registry refuses new sessions, and a session that
//! becomes ready after that point is closed instead of registered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::session::{Session, SessionId};
use crate::transport::{SessionHooks, SessionTransport};

/// Registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The id is already registered
    #[error("Session already registered: {0}")]
    Duplicate(SessionId),
    /// Shutdown has begun
    #[error("Session refused during shutdown: {0}")]
    Closing(SessionId),
}

/// Concurrent map of live sessions
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<Session>>,
    closing: AtomicBool,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. Its state becomes `Active`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] if the id is already live and
    /// [`RegistryError::Closing`] once [`begin_close`](Self::begin_close) ran.
    pub fn register(&self, session: Session) -> Result<Arc<Session>, RegistryError> {
        match self.sessions.entry(session.id().clone()) {
            Entry::Occupied(entry) => Err(RegistryError::Duplicate(entry.key().clone())),
            Entry::Vacant(entry) if self.is_closing() => {
                Err(RegistryError::Closing(entry.key().clone()))
            }
            Entry::Vacant(entry) => {
                session.mark_active();
                let session = Arc::new(session);
                entry.insert(Arc::clone(&session));
                info!(session_id = %session.id(), "Session registered");
                Ok(session)
            }
        }
    }

    /// Refuse every later registration. Cannot be undone.
    pub fn begin_close(&self) {
        self.closing.store(true, Ordering::SeqCst);
    }

    /// Whether [`begin_close`](Self::begin_close) ran
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    /// Look up a live session
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove a session. Its state becomes `Closed`.
    ///
    /// Removing an unknown id is a no-op.
    pub fn remove(&self, id: &str) -> Option<Arc<Session>> {
        let removed = self.sessions.remove(id).map(|(_, session)| session);
        if let Some(session) = &removed {
            session.mark_closed();
            debug!(session_id = %session.id(), "Session removed");
        }
        removed
    }

    /// Whether the id is live
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are live
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Live session ids
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Point-in-time copy of all live sessions.
    ///
    /// No map shard lock is held once this returns.
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Remove every session
    pub fn clear(&self) {
        for session in self.snapshot() {
            session.mark_closed();
        }
        self.sessions.clear();
    }

    /// Hooks that register a handle when it becomes ready and evict it when
    /// it closes.
    ///
    /// The hooks hold a weak reference; a dropped registry makes them no-ops.
    pub fn lifecycle_hooks(self: &Arc<Self>) -> SessionHooks {
        let on_ready: Weak<Self> = Arc::downgrade(self);
        let on_closed: Weak<Self> = Arc::downgrade(self);

        SessionHooks::new()
            .on_ready(move |id: SessionId, transport: Arc<dyn SessionTransport>| {
                let Some(registry) = on_ready.upgrade() else {
                    return;
                };
                match registry.register(Session::new(id, Arc::clone(&transport))) {
                    Ok(_) => {}
                    Err(e @ RegistryError::Closing(_)) => {
                        warn!(error = %e, "Closing session opened during shutdown");
                        close_detached(transport);
                    }
                    Err(e) => warn!(error = %e, "Ignoring duplicate session registration"),
                }
            })
            .on_closed(move |id: SessionId| {
                if let Some(registry) = on_closed.upgrade() {
                    registry.remove(id.as_str());
                }
            })
    }
}

/// Close a handle nobody will own
fn close_detached(transport: Arc<dyn SessionTransport>) {
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(async move {
                if let Err(e) = transport.close().await {
                    warn!(error = %e, "Refused session failed to close");
                }
            });
        }
        Err(_) => warn!("No runtime to close a refused session on"),
    }
}
