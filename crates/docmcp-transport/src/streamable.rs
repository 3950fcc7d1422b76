//! Streamable HTTP transport handle.
//!
//! One [`StreamableSession`] frames protocol traffic for one client:
//!
//! - the first `initialize` request generates the session id and fires the
//!   ready hook before any reply is produced
//! - requests are answered with a single SSE event (or a JSON object in
//!   JSON-response mode)
//! - notifications and client responses are acknowledged with `202`
//! - a GET opens the standalone server push stream (at most one at a time)
//! - closing ends every open stream and fires the closed hook once

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use docmcp_protocol::{JsonRpcHandler, MessageKind, classify, is_initialize_request};
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::session::SessionId;
use crate::transport::{
    SessionHooks, SessionTransport, StreamEvent, TransportError, TransportFactory,
    TransportRequest, TransportResponse,
};

/// Generates session ids on initialization
pub type IdGenerator = Arc<dyn Fn() -> SessionId + Send + Sync>;

#[derive(Default)]
struct Inner {
    session_id: Option<SessionId>,
    closed: bool,
    standalone: Option<mpsc::UnboundedSender<Value>>,
}

/// Streamable HTTP transport handle for one session
pub struct StreamableSession {
    handler: Arc<dyn JsonRpcHandler>,
    json_response: bool,
    id_generator: IdGenerator,
    hooks: SessionHooks,
    inner: Mutex<Inner>,
    closed_tx: watch::Sender<bool>,
    self_ref: Weak<StreamableSession>,
}

impl fmt::Debug for StreamableSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("StreamableSession")
            .field("session_id", &inner.session_id)
            .field("closed", &inner.closed)
            .field("json_response", &self.json_response)
            .finish_non_exhaustive()
    }
}

impl StreamableSession {
    /// Create a handle that is not yet initialized
    pub fn new(
        handler: Arc<dyn JsonRpcHandler>,
        json_response: bool,
        id_generator: IdGenerator,
        hooks: SessionHooks,
    ) -> Arc<Self> {
        let (closed_tx, _) = watch::channel(false);
        Arc::new_cyclic(|self_ref| Self {
            handler,
            json_response,
            id_generator,
            hooks,
            inner: Mutex::new(Inner::default()),
            closed_tx,
            self_ref: self_ref.clone(),
        })
    }

    /// Whether the handle has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Push a server-initiated message onto the standalone stream.
    ///
    /// The documentation gateway sends no server-initiated messages, so its
    /// standalone streams carry keep-alives only; this is the push path for
    /// handlers that do. Returns `false` if no standalone stream is open.
    pub fn send_notification(&self, message: Value) -> bool {
        let inner = self.inner.lock();
        inner
            .standalone
            .as_ref()
            .is_some_and(|tx| tx.send(message).is_ok())
    }

    fn initialize(&self) -> Result<SessionId, TransportError> {
        let id = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(TransportError::Closed);
            }
            if inner.session_id.is_some() {
                return Err(TransportError::AlreadyInitialized);
            }
            let id = (self.id_generator)();
            inner.session_id = Some(id.clone());
            id
        };

        if let Some(this) = self.self_ref.upgrade() {
            let transport: Arc<dyn SessionTransport> = this;
            self.hooks.fire_ready(id.clone(), transport);
        }
        info!(session_id = %id, "Session initialized");
        Ok(id)
    }

    fn current_id(&self) -> Result<SessionId, TransportError> {
        let inner = self.inner.lock();
        if inner.closed {
            return Err(TransportError::Closed);
        }
        inner.session_id.clone().ok_or(TransportError::NotInitialized)
    }

    async fn handle_message(&self, message: Value) -> Result<TransportResponse, TransportError> {
        let kind = classify(&message);
        if kind == MessageKind::Invalid {
            return Err(TransportError::InvalidMessage(
                "expected a JSON-RPC 2.0 message".to_string(),
            ));
        }

        let session_id = if is_initialize_request(&message) {
            self.initialize()?
        } else {
            self.current_id()?
        };

        match kind {
            MessageKind::Notification => {
                let _ = self.handler.handle_request(message).await;
                Ok(TransportResponse::accepted(Some(session_id)))
            }
            MessageKind::Response => Ok(TransportResponse::accepted(Some(session_id))),
            _ if self.json_response => match self.handler.handle_request(message).await {
                Some(reply) => Ok(TransportResponse::json(Some(session_id), reply)),
                None => Ok(TransportResponse::accepted(Some(session_id))),
            },
            _ => Ok(self.reply_stream(session_id, message)),
        }
    }

    /// The handler runs inside the reply stream, so a client disconnect or a
    /// session close drops the in-flight dispatch with it.
    fn reply_stream(&self, session_id: SessionId, message: Value) -> TransportResponse {
        let handler = Arc::clone(&self.handler);
        let mut closed = self.closed_tx.subscribe();

        let stream = async_stream::stream! {
            let dispatch = AssertUnwindSafe(handler.handle_request(message)).catch_unwind();
            tokio::select! {
                outcome = dispatch => match outcome {
                    Ok(Some(reply)) => yield Ok(StreamEvent::message(reply)),
                    Ok(None) => {}
                    Err(_) => yield Err(TransportError::Dispatch("handler panicked".to_string())),
                },
                // The watch guard must not outlive this branch
                Ok(()) = async { closed.wait_for(|closed| *closed).await.map(|_| ()) } => {
                    debug!("Session closed before the reply was ready");
                }
            }
        };

        TransportResponse::stream(Some(session_id), Box::pin(stream))
    }

    fn open_stream(&self) -> Result<TransportResponse, TransportError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
        let session_id = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(TransportError::Closed);
            }
            let session_id = inner
                .session_id
                .clone()
                .ok_or(TransportError::NotInitialized)?;
            if inner.standalone.as_ref().is_some_and(|tx| !tx.is_closed()) {
                return Err(TransportError::StreamConflict);
            }
            inner.standalone = Some(tx);
            session_id
        };

        let guard = DisconnectGuard {
            session: self.self_ref.clone(),
        };
        let stream = async_stream::stream! {
            let _guard = guard;
            while let Some(message) = rx.recv().await {
                yield Ok(StreamEvent::message(message));
            }
        };

        debug!(session_id = %session_id, "Standalone stream opened");
        Ok(TransportResponse::stream(Some(session_id), Box::pin(stream)))
    }

    /// Close synchronously. Returns `false` if already closed.
    fn close_now(&self) -> bool {
        let session_id = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return false;
            }
            inner.closed = true;
            inner.standalone = None;
            inner.session_id.clone()
        };

        self.closed_tx.send_replace(true);
        if let Some(id) = session_id {
            info!(session_id = %id, "Session closed");
            self.hooks.fire_closed(id);
        }
        true
    }
}

#[async_trait]
impl SessionTransport for StreamableSession {
    async fn handle(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        match request {
            TransportRequest::Message(message) => self.handle_message(message).await,
            TransportRequest::OpenStream => self.open_stream(),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.close_now();
        Ok(())
    }

    fn session_id(&self) -> Option<SessionId> {
        self.inner.lock().session_id.clone()
    }
}

/// Closes the session when the standalone stream is dropped by the client.
struct DisconnectGuard {
    session: Weak<StreamableSession>,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        if let Some(session) = self.session.upgrade()
            && session.close_now()
        {
            warn!("Standalone stream disconnected, session closed");
        }
    }
}

/// Builds a [`StreamableSession`] per new session
#[derive(Clone)]
pub struct StreamableFactory {
    handler: Arc<dyn JsonRpcHandler>,
    json_response: bool,
    id_generator: IdGenerator,
}

impl fmt::Debug for StreamableFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamableFactory")
            .field("json_response", &self.json_response)
            .finish_non_exhaustive()
    }
}

impl StreamableFactory {
    /// Factory producing handles that dispatch to `handler`
    pub fn new(handler: Arc<dyn JsonRpcHandler>, json_response: bool) -> Self {
        Self {
            handler,
            json_response,
            id_generator: Arc::new(SessionId::new),
        }
    }

    /// Replace the session id generator
    pub fn with_id_generator(
        mut self,
        generator: impl Fn() -> SessionId + Send + Sync + 'static,
    ) -> Self {
        self.id_generator = Arc::new(generator);
        self
    }
}

impl TransportFactory for StreamableFactory {
    fn create(&self, hooks: SessionHooks) -> Arc<dyn SessionTransport> {
        StreamableSession::new(
            Arc::clone(&self.handler),
            self.json_response,
            Arc::clone(&self.id_generator),
            hooks,
        )
    }
}
