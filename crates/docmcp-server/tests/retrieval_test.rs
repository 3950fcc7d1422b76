//! Retrieval client against a mocked backend.

use std::time::Duration;

use docmcp_server::{NO_INFORMATION, RetrievalClient, RetrievalError};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> RetrievalClient {
    RetrievalClient::new(server.uri(), Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn test_search_joins_contexts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_json(json!({"message": "rate limits", "contexts": ["earlier"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contexts": ["First passage", {"text": "Second passage"}, ""]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = client(&server)
        .search("rate limits", &["earlier".to_string()])
        .await;
    assert_eq!(text, "First passage\n\nSecond passage");
}

#[tokio::test]
async fn test_search_server_error_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client.try_search("anything", &[]).await.unwrap_err();
    assert!(matches!(err, RetrievalError::Status(500)));
    assert_eq!(client.search("anything", &[]).await, NO_INFORMATION);
}

#[tokio::test]
async fn test_search_empty_contexts_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"contexts": []})))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(matches!(
        client.try_search("q", &[]).await,
        Err(RetrievalError::Empty)
    ));
    assert_eq!(client.search("q", &[]).await, NO_INFORMATION);
}

#[tokio::test]
async fn test_search_malformed_body_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    assert_eq!(client(&server).search("q", &[]).await, NO_INFORMATION);
}

#[tokio::test]
async fn test_unreachable_backend_falls_back() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let client = RetrievalClient::new(uri, Duration::from_millis(500)).unwrap();
    assert_eq!(client.search("q", &[]).await, NO_INFORMATION);
    assert_eq!(client.instructions().await, NO_INFORMATION);
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"contexts": ["late"]}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = RetrievalClient::new(server.uri(), Duration::from_millis(100)).unwrap();
    assert!(matches!(
        client.try_search("q", &[]).await,
        Err(RetrievalError::Http(_))
    ));
}

#[tokio::test]
async fn test_instructions_rendered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/instructions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "preamble": "Welcome.",
            "systemInstructions": "Cite sources.",
            "europeanEconomicAreaTermsDisclaimer": ""
        })))
        .mount(&server)
        .await;

    assert_eq!(
        client(&server).instructions().await,
        "Welcome.\n\nCite sources."
    );
}

#[tokio::test]
async fn test_instructions_not_found_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/instructions"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert_eq!(client(&server).instructions().await, NO_INFORMATION);
}
