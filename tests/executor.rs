//! Request executor against a local canned server.

mod common;

use std::time::Duration;

use apidash::models::{AuthType, Header, HttpMethod, RequestSpec};
use apidash::Executor;
use common::{CannedServer, SilentServer, UNREACHABLE};
use serde_json::json;

#[tokio::test]
async fn test_json_response_is_parsed() {
    let server = CannedServer::start("200 OK", "application/json", r#"{"id": 42, "name": "Ada"}"#).await;

    let mut request = RequestSpec::new(HttpMethod::GET, format!("{}/users/42", server.url));
    request.query.push(("verbose".into(), "true".into()));
    request.headers.push(Header::new("X-Trace", "abc"));
    let mut disabled = Header::new("X-Off", "1");
    disabled.enabled = false;
    request.headers.push(disabled);

    let result = Executor::new(Duration::from_secs(5)).execute(&request).await;
    let received = server.received().await;

    assert_eq!(result.status, Some(200));
    assert!(result.error.is_none());
    assert!(result.is_success());
    assert_eq!(result.structured, Some(json!({"id": 42, "name": "Ada"})));
    assert_eq!(result.size_bytes, result.body.len());
    assert_eq!(result.headers["x-served-by"], "canned");
    assert!(result.url.ends_with("/users/42?verbose=true"));

    assert!(received.starts_with("GET /users/42?verbose=true HTTP/1.1"));
    let lower = received.to_lowercase();
    assert!(lower.contains("x-trace: abc"));
    assert!(!lower.contains("x-off"));
}

#[tokio::test]
async fn test_non_2xx_is_a_completed_execution() {
    let server = CannedServer::start("404 Not Found", "text/plain", "nope").await;
    let request = RequestSpec::new(HttpMethod::DELETE, format!("{}/users/1", server.url));

    let result = Executor::default().execute(&request).await;
    server.received().await;

    assert_eq!(result.status, Some(404));
    assert!(result.error.is_none());
    assert!(!result.is_success());
    assert_eq!(result.body, "nope");
    assert_eq!(result.structured, None);
}

#[tokio::test]
async fn test_structured_body_is_sent_as_json_with_auth() {
    let server = CannedServer::start("201 Created", "application/json", "{}").await;
    let mut request = RequestSpec::new(HttpMethod::POST, format!("{}/users", server.url));
    request.body = Some(json!({"name": "Ada"}));
    request.auth = AuthType::Bearer("t0k".into());

    let result = Executor::default().execute(&request).await;
    let received = server.received().await;

    assert_eq!(result.status, Some(201));
    let lower = received.to_lowercase();
    assert!(lower.contains("content-type: application/json"));
    assert!(lower.contains("authorization: bearer t0k"));
    assert!(received.ends_with(r#"{"name":"Ada"}"#));
}

#[tokio::test]
async fn test_yaml_response_is_parsed() {
    let server = CannedServer::start("200 OK", "application/yaml", "name: Ada\nage: 36\n").await;
    let request = RequestSpec::new(HttpMethod::GET, format!("{}/me", server.url));

    let result = Executor::default().execute(&request).await;
    server.received().await;

    assert_eq!(result.structured, Some(json!({"name": "Ada", "age": 36})));
}

#[tokio::test]
async fn test_unreachable_host_is_reported_not_raised() {
    let request = RequestSpec::new(HttpMethod::GET, format!("{}/health", UNREACHABLE));
    let result = Executor::new(Duration::from_secs(5)).execute(&request).await;

    assert!(result.is_failure());
    assert_eq!(result.status, None);
    assert!(result.error.is_some());
    assert!(result.body.is_empty());
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let server = SilentServer::start().await;
    let request = RequestSpec::new(HttpMethod::GET, format!("{}/slow", server.url));

    let result = Executor::new(Duration::from_secs(1)).execute(&request).await;

    assert!(result.is_failure());
    assert_eq!(result.status, None);
    assert!(result.error.as_deref().unwrap_or_default().contains("timed out"));
    assert!(result.elapsed_ms >= 1000);
    assert!(result.elapsed_ms < 10_000);
}
