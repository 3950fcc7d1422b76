//! Request router tests
//!
//! Drives the axum router in-process with `tower::ServiceExt::oneshot`.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use docmcp_protocol::{HandlerFuture, JsonRpcHandler};
use docmcp_transport::{
    MCP_PROTOCOL_VERSION_HEADER, MCP_SESSION_ID_HEADER, SessionHooks, SessionId, SessionRegistry,
    SessionTransport, StreamableFactory, StreamableHttpConfigBuilder, TransportError,
    TransportFactory, TransportRequest, TransportResponse, create_router,
    security::DeploymentMode,
};
use docmcp_transport::session::MAX_SESSION_ID_LEN;
use http::{HeaderValue, Request, Response, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

const BOTH: &str = "application/json, text/event-stream";

struct EchoHandler;

impl JsonRpcHandler for EchoHandler {
    fn handle_request(&self, request: Value) -> HandlerFuture<'_> {
        Box::pin(async move {
            let id = request.get("id").cloned()?;
            Some(json!({"jsonrpc": "2.0", "id": id, "result": {"method": request["method"]}}))
        })
    }
}

fn app_with(json_response: bool, mode: DeploymentMode) -> (Router, Arc<SessionRegistry>) {
    let registry = Arc::new(SessionRegistry::new());
    let config = StreamableHttpConfigBuilder::new()
        .with_json_response(json_response)
        .with_mode(mode)
        .with_allowed_origins(["https://app.example.com"])
        .build();
    let factory = Arc::new(StreamableFactory::new(Arc::new(EchoHandler), json_response));
    (
        create_router(config, Arc::clone(&registry), factory),
        registry,
    )
}

fn app() -> (Router, Arc<SessionRegistry>) {
    app_with(true, DeploymentMode::Development)
}

fn initialize_body() -> String {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {"protocolVersion": "2025-06-18", "capabilities": {}, "clientInfo": {"name": "test", "version": "1.0"}}
    })
    .to_string()
}

fn post_request(body: impl Into<String>, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body.into())).unwrap()
}

fn request(method: &str, uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn session_header(response: &Response<Body>) -> String {
    response
        .headers()
        .get(MCP_SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string()
}

async fn initialize(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(post_request(initialize_body(), &[("accept", BOTH)]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    session_header(&response)
}

fn data_code(body: &Value) -> &str {
    body["error"]["data"]["code"].as_str().unwrap()
}

#[tokio::test]
async fn test_initialize_creates_session() {
    let (app, registry) = app();

    let response = app
        .clone()
        .oneshot(post_request(initialize_body(), &[("accept", BOTH)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(MCP_PROTOCOL_VERSION_HEADER).unwrap(),
        "2025-06-18"
    );
    let session_id = session_header(&response);
    assert!(registry.contains(&session_id));
    assert_eq!(registry.len(), 1);

    let body = json_body(response).await;
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["method"], "initialize");
}

#[tokio::test]
async fn test_initialize_streams_sse_by_default() {
    let (app, registry) = app_with(false, DeploymentMode::Development);

    let response = app
        .clone()
        .oneshot(post_request(initialize_body(), &[("accept", BOTH)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
    assert_eq!(registry.len(), 1);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("event: message"));
    assert!(text.contains(r#""method":"initialize""#));
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let (app, _registry) = app();

    let response = app
        .oneshot(post_request(
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}).to_string(),
            &[("accept", BOTH), (MCP_SESSION_ID_HEADER, "missing-id")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(data_code(&body), "SESSION_NOT_FOUND");
    assert_eq!(body["error"]["code"], -32000);
    assert_eq!(body["id"], Value::Null);
}

#[tokio::test]
async fn test_missing_accept_rejected_before_registry() {
    let (app, registry) = app();

    let response = app
        .oneshot(post_request(initialize_body(), &[]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
    assert_eq!(data_code(&json_body(response).await), "INVALID_ACCEPT_HEADER");
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_partial_accept_rejected() {
    let (app, registry) = app();

    let response = app
        .oneshot(post_request(
            initialize_body(),
            &[("accept", "application/json")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_remote_origin_rejected_in_development() {
    let (app, registry) = app();

    let response = app
        .oneshot(post_request(
            initialize_body(),
            &[("accept", BOTH), ("origin", "http://evil.com")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(data_code(&json_body(response).await), "INVALID_ORIGIN");
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_origin_checked_before_accept() {
    let (app, _registry) = app();

    let response = app
        .oneshot(post_request(initialize_body(), &[("origin", "http://evil.com")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_production_allow_list() {
    let (app, _registry) = app_with(true, DeploymentMode::Production);

    let allowed = app
        .clone()
        .oneshot(post_request(
            initialize_body(),
            &[("accept", BOTH), ("origin", "https://app.example.com")],
        ))
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);

    let localhost = app
        .oneshot(post_request(
            initialize_body(),
            &[("accept", BOTH), ("origin", "http://localhost:3000")],
        ))
        .await
        .unwrap();
    assert_eq!(localhost.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_non_init_without_session_is_bad_request() {
    let (app, registry) = app();

    for headers in [
        vec![("accept", BOTH)],
        vec![("accept", BOTH), (MCP_SESSION_ID_HEADER, "")],
    ] {
        let response = app
            .clone()
            .oneshot(post_request(
                json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}).to_string(),
                &headers,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(data_code(&body), "BAD_REQUEST");
        assert!(
            body["error"]["message"]
                .as_str()
                .unwrap()
                .contains("No valid session ID provided for non-init request")
        );
    }
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_invalid_json_is_parse_error() {
    let (app, _registry) = app();

    let response = app
        .oneshot(post_request("{not json", &[("accept", BOTH)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(data_code(&body), "PARSE_ERROR");
}

#[tokio::test]
async fn test_session_lifecycle() {
    let (app, registry) = app();
    let session_id = initialize(&app).await;

    let notified = app
        .clone()
        .oneshot(post_request(
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
            &[("accept", BOTH), (MCP_SESSION_ID_HEADER, session_id.as_str())],
        ))
        .await
        .unwrap();
    assert_eq!(notified.status(), StatusCode::ACCEPTED);

    let listed = app
        .clone()
        .oneshot(post_request(
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}).to_string(),
            &[("accept", BOTH), (MCP_SESSION_ID_HEADER, session_id.as_str())],
        ))
        .await
        .unwrap();
    assert_eq!(listed.status(), StatusCode::OK);
    assert_eq!(json_body(listed).await["result"]["method"], "tools/list");

    let reinit = app
        .clone()
        .oneshot(post_request(
            initialize_body(),
            &[("accept", BOTH), (MCP_SESSION_ID_HEADER, session_id.as_str())],
        ))
        .await
        .unwrap();
    assert_eq!(reinit.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(reinit).await["error"]["code"], -32600);

    let deleted = app
        .clone()
        .oneshot(request(
            "DELETE",
            "/mcp",
            &[("accept", BOTH), (MCP_SESSION_ID_HEADER, session_id.as_str())],
        ))
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);
    assert!(registry.is_empty());

    let again = app
        .clone()
        .oneshot(request(
            "DELETE",
            "/mcp",
            &[("accept", BOTH), (MCP_SESSION_ID_HEADER, session_id.as_str())],
        ))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);

    let after = app
        .oneshot(post_request(
            json!({"jsonrpc": "2.0", "id": 3, "method": "ping"}).to_string(),
            &[("accept", BOTH), (MCP_SESSION_ID_HEADER, session_id.as_str())],
        ))
        .await
        .unwrap();
    assert_eq!(after.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_requires_session_header() {
    let (app, _registry) = app();

    let response = app
        .oneshot(request("DELETE", "/mcp", &[("accept", BOTH)]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_stream_rules() {
    let (app, registry) = app();

    let no_session = app
        .clone()
        .oneshot(request("GET", "/mcp", &[("accept", BOTH)]))
        .await
        .unwrap();
    assert_eq!(no_session.status(), StatusCode::BAD_REQUEST);
    assert!(
        json_body(no_session).await["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Valid session ID required for GET requests")
    );

    let session_id = initialize(&app).await;
    let stream = app
        .clone()
        .oneshot(request(
            "GET",
            "/mcp",
            &[("accept", BOTH), (MCP_SESSION_ID_HEADER, session_id.as_str())],
        ))
        .await
        .unwrap();
    assert_eq!(stream.status(), StatusCode::OK);
    assert_eq!(
        stream.headers().get("content-type").unwrap(),
        "text/event-stream"
    );

    let conflict = app
        .clone()
        .oneshot(request(
            "GET",
            "/mcp",
            &[("accept", BOTH), (MCP_SESSION_ID_HEADER, session_id.as_str())],
        ))
        .await
        .unwrap();
    assert_eq!(conflict.status(), StatusCode::CONFLICT);
    assert_eq!(data_code(&json_body(conflict).await), "CONFLICT");

    // Client disconnect closes the session
    drop(stream);
    assert!(!registry.contains(&session_id));
}

#[tokio::test]
async fn test_health_is_not_validated() {
    let (app, _registry) = app();
    let _session = initialize(&app).await;

    let response = app
        .oneshot(request("GET", "/health", &[("origin", "http://evil.com")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["activeSessions"], 1);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_oversized_body_gets_envelope() {
    let registry = Arc::new(SessionRegistry::new());
    let config = StreamableHttpConfigBuilder::new()
        .with_json_response(true)
        .with_max_body_size(64)
        .build();
    let factory = Arc::new(StreamableFactory::new(Arc::new(EchoHandler), true));
    let app = create_router(config, Arc::clone(&registry), factory);

    let response = app
        .oneshot(post_request(initialize_body(), &[("accept", BOTH)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = json_body(response).await;
    assert_eq!(data_code(&body), "PAYLOAD_TOO_LARGE");
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["id"], Value::Null);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_unsupported_method_gets_envelope() {
    let (app, _registry) = app();

    let response = app
        .clone()
        .oneshot(request("PUT", "/mcp", &[("accept", BOTH)]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers().get("allow").unwrap(), "GET, POST, DELETE");
    let body = json_body(response).await;
    assert_eq!(data_code(&body), "METHOD_NOT_ALLOWED");
    assert_eq!(body["jsonrpc"], "2.0");

    let response = app
        .clone()
        .oneshot(request("PATCH", "/mcp", &[("accept", BOTH)]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = app
        .oneshot(request("GET", "/elsewhere", &[]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(data_code(&json_body(response).await), "NOT_FOUND");
}

fn post_with_raw_session(body: String, session_id: HeaderValue) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .header("accept", BOTH)
        .header(MCP_SESSION_ID_HEADER, session_id)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_non_utf8_session_id_is_unknown() {
    let (app, registry) = app();
    let garbled = HeaderValue::from_bytes(&[b'a', 0xff, b'b']).unwrap();

    let response = app
        .clone()
        .oneshot(post_with_raw_session(
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}).to_string(),
            garbled.clone(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(data_code(&json_body(response).await), "SESSION_NOT_FOUND");

    // An initialize carrying a session id never creates a new session
    let response = app
        .clone()
        .oneshot(post_with_raw_session(initialize_body(), garbled.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(registry.is_empty());

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/mcp")
                .header("accept", BOTH)
                .header(MCP_SESSION_ID_HEADER, garbled)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_overlong_session_id_is_unknown() {
    let (app, registry) = app();
    let _live = initialize(&app).await;
    let overlong = "s".repeat(MAX_SESSION_ID_LEN + 1);

    let response = app
        .clone()
        .oneshot(post_request(
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}).to_string(),
            &[("accept", BOTH), (MCP_SESSION_ID_HEADER, overlong.as_str())],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(data_code(&json_body(response).await), "SESSION_NOT_FOUND");

    let response = app
        .oneshot(request(
            "DELETE",
            "/mcp",
            &[("accept", BOTH), (MCP_SESSION_ID_HEADER, overlong.as_str())],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(registry.len(), 1);
}

/// Transport that registers itself on first use and misbehaves on demand
struct FaultyTransport {
    id: SessionId,
    hooks: SessionHooks,
    panic_on_handle: bool,
    self_ref: Weak<FaultyTransport>,
}

#[async_trait]
impl SessionTransport for FaultyTransport {
    async fn handle(&self, _: TransportRequest) -> Result<TransportResponse, TransportError> {
        if self.panic_on_handle {
            panic!("handler exploded");
        }
        if let Some(this) = self.self_ref.upgrade() {
            self.hooks.fire_ready(self.id.clone(), this);
        }
        Ok(TransportResponse::json(
            Some(self.id.clone()),
            json!({"jsonrpc": "2.0", "id": 1, "result": {}}),
        ))
    }

    async fn close(&self) -> Result<(), TransportError> {
        Err(TransportError::Dispatch("close failed".to_string()))
    }

    fn session_id(&self) -> Option<SessionId> {
        Some(self.id.clone())
    }
}

struct FaultyFactory {
    panic_on_handle: bool,
}

impl TransportFactory for FaultyFactory {
    fn create(&self, hooks: SessionHooks) -> Arc<dyn SessionTransport> {
        let panic_on_handle = self.panic_on_handle;
        Arc::new_cyclic(|self_ref| FaultyTransport {
            id: SessionId::new(),
            hooks,
            panic_on_handle,
            self_ref: self_ref.clone(),
        })
    }
}

fn faulty_app(panic_on_handle: bool) -> (Router, Arc<SessionRegistry>) {
    let registry = Arc::new(SessionRegistry::new());
    let app = create_router(
        StreamableHttpConfigBuilder::new().build(),
        Arc::clone(&registry),
        Arc::new(FaultyFactory { panic_on_handle }),
    );
    (app, registry)
}

#[tokio::test]
async fn test_delete_removes_session_even_if_close_fails() {
    let (app, registry) = faulty_app(false);
    let session_id = initialize(&app).await;
    assert_eq!(registry.len(), 1);

    let response = app
        .oneshot(request(
            "DELETE",
            "/mcp",
            &[("accept", BOTH), (MCP_SESSION_ID_HEADER, session_id.as_str())],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_dispatch_panic_is_internal_error() {
    let (app, registry) = faulty_app(true);

    let response = app
        .oneshot(post_request(initialize_body(), &[("accept", BOTH)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], -32603);
    assert_eq!(body["error"]["message"], "Internal server error");
    assert_eq!(data_code(&body), "INTERNAL_ERROR");
    assert!(registry.is_empty());
}
