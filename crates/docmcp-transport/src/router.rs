//! Streamable HTTP request router.
//!
//! A single protocol endpoint handles three methods:
//!
//! - **POST** delivers a JSON-RPC message. An `initialize` request without a
//!   session header creates a new session; everything else must carry the
//!   `mcp-session-id` of a live session.
//! - **GET** opens the session's standalone server push stream.
//! - **DELETE** terminates a session.
//!
//! Origin and Accept validation runs first on every endpoint request, Origin
//! before Accept. `/health` sits outside the endpoint and is never validated.
//! Other methods, unknown paths and oversized bodies are answered with the
//! same JSON-RPC error envelope as every other rejection.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Request, State, rejection::BytesRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use chrono::Utc;
use docmcp_protocol::{LATEST_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS, is_initialize_request};
use futures::StreamExt;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::config::StreamableHttpConfig;
use crate::envelope::ErrorEnvelope;
use crate::registry::SessionRegistry;
use crate::security::{TEXT_EVENT_STREAM, accepts, validate_request_headers};
use crate::session::{MAX_SESSION_ID_LEN, dispatch};
use crate::transport::{
    ReplyBody, StreamEvent, TransportError, TransportFactory, TransportRequest, TransportResponse,
};

/// Session id header (matched case-insensitively)
pub const MCP_SESSION_ID_HEADER: &str = "mcp-session-id";

/// Protocol version header
pub const MCP_PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

/// Shared router state
#[derive(Clone)]
pub struct AppState {
    registry: Arc<SessionRegistry>,
    factory: Arc<dyn TransportFactory>,
    config: Arc<StreamableHttpConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("sessions", &self.registry.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Create the axum router for the streamable HTTP transport
///
/// # Arguments
///
/// * `config` - Transport configuration
/// * `registry` - Live session registry, shared with the shutdown coordinator
/// * `factory` - Builds the transport handle for each new session
pub fn create_router(
    config: StreamableHttpConfig,
    registry: Arc<SessionRegistry>,
    factory: Arc<dyn TransportFactory>,
) -> Router {
    let max_body_size = config.max_body_size;
    let state = AppState {
        registry,
        factory,
        config: Arc::new(config),
    };

    let endpoint = Router::new()
        .route(
            &state.config.endpoint_path,
            get(mcp_get_handler)
                .post(mcp_post_handler)
                .delete(mcp_delete_handler)
                .fallback(method_not_allowed),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            validate_headers,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .merge(endpoint)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Header value as text; a non-UTF-8 value reads as empty so it fails validation
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .map(|value| value.to_str().unwrap_or_default())
}

/// The `mcp-session-id` header as the client sent it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionHeader<'a> {
    /// Missing or empty
    Absent,
    /// A value that may name a live session
    Id(&'a str),
    /// Non-UTF-8 or longer than any issued id; never matches a session
    Unknown,
}

fn session_id_header(headers: &HeaderMap) -> SessionHeader<'_> {
    let Some(value) = headers.get(MCP_SESSION_ID_HEADER) else {
        return SessionHeader::Absent;
    };
    if value.is_empty() {
        return SessionHeader::Absent;
    }
    match value.to_str() {
        Ok(id) if id.len() <= MAX_SESSION_ID_LEN => SessionHeader::Id(id),
        _ => SessionHeader::Unknown,
    }
}

fn protocol_version(headers: &HeaderMap) -> &'static str {
    header_str(headers, MCP_PROTOCOL_VERSION_HEADER)
        .and_then(|requested| {
            SUPPORTED_PROTOCOL_VERSIONS
                .iter()
                .copied()
                .find(|supported| *supported == requested)
        })
        .unwrap_or(LATEST_PROTOCOL_VERSION)
}

async fn validate_headers(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let headers = request.headers();
    let origin = header_str(headers, header::ORIGIN.as_str());
    let accept = header_str(headers, header::ACCEPT.as_str());

    if let Err(e) = validate_request_headers(&state.config.origin_policy, origin, accept) {
        warn!(
            method = %request.method(),
            origin = origin.unwrap_or("-"),
            error = %e,
            "Rejecting request"
        );
        return ErrorEnvelope::from(&e).into_response();
    }

    next.run(request).await
}

/// POST handler - Accepts JSON-RPC messages
async fn mcp_post_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(status = %rejection.status(), error = %rejection, "Rejecting request body");
            return body_rejection(&rejection, state.config.max_body_size).into_response();
        }
    };

    let message: Value = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "Rejecting unparseable request body");
            return ErrorEnvelope::parse_error(e).into_response();
        }
    };

    let result = match session_id_header(&headers) {
        SessionHeader::Id(session_id) => match state.registry.get(session_id) {
            Some(session) => session.forward(TransportRequest::Message(message)).await,
            None => {
                debug!(session_id, "POST for unknown session");
                return ErrorEnvelope::session_not_found().into_response();
            }
        },
        SessionHeader::Unknown => {
            debug!("POST with unusable session id");
            return ErrorEnvelope::session_not_found().into_response();
        }
        SessionHeader::Absent if is_initialize_request(&message) => {
            let transport = state.factory.create(state.registry.lifecycle_hooks());
            dispatch(&transport, TransportRequest::Message(message)).await
        }
        SessionHeader::Absent => {
            return ErrorEnvelope::bad_request(
                "Bad Request: No valid session ID provided for non-init request",
            )
            .into_response();
        }
    };

    reply_or_error(result, protocol_version(&headers), state.config.keep_alive)
}

/// GET handler - Opens the standalone SSE stream of a live session
async fn mcp_get_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = match session_id_header(&headers) {
        SessionHeader::Id(id) => state.registry.get(id),
        SessionHeader::Absent | SessionHeader::Unknown => None,
    };
    let Some(session) = session else {
        return ErrorEnvelope::bad_request("Bad Request: Valid session ID required for GET requests")
            .into_response();
    };

    if !accepts(header_str(&headers, header::ACCEPT.as_str()), TEXT_EVENT_STREAM) {
        return ErrorEnvelope::bad_request(
            "Bad Request: Accept header must include text/event-stream for GET requests",
        )
        .into_response();
    }

    let result = session.forward(TransportRequest::OpenStream).await;
    reply_or_error(result, protocol_version(&headers), state.config.keep_alive)
}

/// DELETE handler - Terminates a session
///
/// Close failures are logged; the session is removed regardless.
async fn mcp_delete_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session_id = match session_id_header(&headers) {
        SessionHeader::Id(session_id) => session_id,
        SessionHeader::Unknown => return ErrorEnvelope::session_not_found().into_response(),
        SessionHeader::Absent => {
            return ErrorEnvelope::bad_request(
                "Bad Request: Valid session ID required for DELETE requests",
            )
            .into_response();
        }
    };

    let Some(session) = state.registry.get(session_id) else {
        return ErrorEnvelope::session_not_found().into_response();
    };

    if let Err(e) = session.close().await {
        warn!(session_id, error = %e, "Session close failed during DELETE");
    }
    state.registry.remove(session_id);

    (StatusCode::OK, version_headers(protocol_version(&headers))).into_response()
}

async fn method_not_allowed() -> Response {
    let mut response = ErrorEnvelope::method_not_allowed().into_response();
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("GET, POST, DELETE"));
    response
}

async fn not_found() -> ErrorEnvelope {
    ErrorEnvelope::not_found()
}

fn body_rejection(rejection: &BytesRejection, max_body_size: usize) -> ErrorEnvelope {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ErrorEnvelope::payload_too_large(max_body_size)
    } else {
        ErrorEnvelope::bad_request(format!("Bad Request: {}", rejection.body_text()))
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "activeSessions": state.registry.len(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

fn version_headers(protocol_version: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        MCP_PROTOCOL_VERSION_HEADER,
        HeaderValue::from_static(protocol_version),
    );
    headers
}

fn reply_or_error(
    result: Result<TransportResponse, TransportError>,
    protocol_version: &'static str,
    keep_alive: Duration,
) -> Response {
    match result {
        Ok(reply) => into_http(reply, protocol_version, keep_alive),
        Err(e @ TransportError::Dispatch(_)) => {
            error!(error = %e, "Request dispatch failed");
            ErrorEnvelope::from(&e).into_response()
        }
        Err(e) => {
            debug!(error = %e, "Transport rejected request");
            ErrorEnvelope::from(&e).into_response()
        }
    }
}

fn into_http(reply: TransportResponse, protocol_version: &'static str, keep_alive: Duration) -> Response {
    let mut headers = version_headers(protocol_version);
    if let Some(session_id) = &reply.session_id
        && let Ok(value) = HeaderValue::from_str(session_id.as_str())
    {
        headers.insert(MCP_SESSION_ID_HEADER, value);
    }

    match reply.body {
        ReplyBody::Json(value) => (reply.status, headers, Json(value)).into_response(),
        ReplyBody::Accepted => (reply.status, headers).into_response(),
        ReplyBody::Stream(stream) => {
            let events = stream.map(|item| match item {
                Ok(event) => Ok(sse_event(event)),
                Err(e) => {
                    error!(error = %e, "Stream failed after response started, abandoning connection");
                    Err(e)
                }
            });
            (
                reply.status,
                headers,
                Sse::new(events).keep_alive(KeepAlive::new().interval(keep_alive)),
            )
                .into_response()
        }
    }
}

fn sse_event(event: StreamEvent) -> Event {
    Event::default()
        .id(event.id)
        .event(event.event)
        .data(event.data.to_string())
}
