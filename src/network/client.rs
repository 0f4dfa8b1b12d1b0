//! HTTP client wrapper - executes one request and captures the outcome

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::constants::DEFAULT_TIMEOUT_SECS;
use crate::models::{HttpMethod, RequestSpec};

/// Why a request produced no response
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Request timed out ({0}s)")]
    Timeout(u64),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Error reading body: {0}")]
    Body(String),

    #[error("Request failed: {0}")]
    Other(String),
}

impl NetworkError {
    fn from_reqwest(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            NetworkError::Timeout(timeout.as_secs())
        } else if err.is_connect() {
            NetworkError::Connect(error_chain(err))
        } else if err.is_builder() {
            NetworkError::InvalidRequest(error_chain(err))
        } else if err.is_body() || err.is_decode() {
            NetworkError::Body(error_chain(err))
        } else {
            NetworkError::Other(error_chain(err))
        }
    }
}

/// reqwest hides the interesting part (refused, DNS) in the source chain
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

/// Outcome of one execution. A missing status means no response arrived and
/// `error` says why; any status, 2xx or not, is a completed execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub method: HttpMethod,
    /// URL as sent, query included
    pub url: String,
    /// URL after redirects
    pub final_url: Option<String>,
    pub status: Option<u16>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    /// Parsed body when the content type is JSON or YAML
    pub structured: Option<Value>,
    pub elapsed_ms: u64,
    pub size_bytes: usize,
    pub error: Option<String>,
}

impl ExecutionResult {
    fn failed(method: HttpMethod, url: String, error: NetworkError, elapsed_ms: u64) -> Self {
        ExecutionResult {
            method,
            url,
            final_url: None,
            status: None,
            headers: BTreeMap::new(),
            body: String::new(),
            structured: None,
            elapsed_ms,
            size_bytes: 0,
            error: Some(error.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status.is_none()
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(200..=299))
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.as_str())
    }

    /// Pretty-printed JSON when the body parsed, raw text otherwise
    pub fn pretty_body(&self) -> String {
        match &self.structured {
            Some(value) => serde_json::to_string_pretty(value).unwrap_or_else(|_| self.body.clone()),
            None => self.body.clone(),
        }
    }
}

/// Issues requests with a fixed timeout ceiling
#[derive(Debug, Clone)]
pub struct Executor {
    client: reqwest::Client,
    timeout: Duration,
}

impl Default for Executor {
    fn default() -> Self {
        Executor::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl Executor {
    pub fn new(timeout: Duration) -> Self {
        Executor {
            client: create_client(timeout),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Executes an already resolved request. Never fails: network-level
    /// problems come back in [`ExecutionResult::error`].
    pub async fn execute(&self, request: &RequestSpec) -> ExecutionResult {
        let url = request.full_url();
        let start = Instant::now();

        let builder = match self.build_request(request) {
            Ok(builder) => builder,
            Err(e) => {
                warn!(method = %request.method, url = %url, error = %e, "request rejected");
                return ExecutionResult::failed(request.method, url, e, 0);
            }
        };

        let response = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                let error = NetworkError::from_reqwest(&e, self.timeout);
                warn!(method = %request.method, url = %url, elapsed_ms, error = %error, "request failed");
                return ExecutionResult::failed(request.method, url, error, elapsed_ms);
            }
        };

        let status = response.status().as_u16();
        let final_url = Some(response.url().to_string());
        let headers = flatten_headers(response.headers());

        let (body, size_bytes, error) = match response.bytes().await {
            Ok(bytes) => (String::from_utf8_lossy(&bytes).into_owned(), bytes.len(), None),
            Err(e) => {
                let error = NetworkError::Body(error_chain(&e));
                (String::new(), 0, Some(error.to_string()))
            }
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let content_type = headers
            .get(CONTENT_TYPE.as_str())
            .map(String::as_str);
        let structured = parse_structured(content_type, &body);

        info!(
            method = %request.method,
            url = %url,
            status,
            elapsed_ms,
            size_bytes,
            "request completed"
        );

        ExecutionResult {
            method: request.method,
            url,
            final_url,
            status: Some(status),
            headers,
            body,
            structured,
            elapsed_ms,
            size_bytes,
            error,
        }
    }

    /// Build a reqwest request from a resolved spec
    fn build_request(&self, request: &RequestSpec) -> Result<reqwest::RequestBuilder, NetworkError> {
        let url = reqwest::Url::parse(&request.url).map_err(|e| {
            NetworkError::InvalidRequest(format!("invalid URL '{}': {}", request.url, e))
        })?;

        let method = match request.method {
            HttpMethod::GET => reqwest::Method::GET,
            HttpMethod::POST => reqwest::Method::POST,
            HttpMethod::PUT => reqwest::Method::PUT,
            HttpMethod::PATCH => reqwest::Method::PATCH,
            HttpMethod::DELETE => reqwest::Method::DELETE,
            HttpMethod::HEAD => reqwest::Method::HEAD,
            HttpMethod::OPTIONS => reqwest::Method::OPTIONS,
        };

        let mut req_builder = self
            .client
            .request(method, url)
            .timeout(self.timeout);

        if !request.query.is_empty() {
            req_builder = req_builder.query(&request.query);
        }

        // Add headers
        for header in request.headers.iter().filter(|h| h.enabled) {
            req_builder = req_builder.header(&header.key, &header.value);
        }

        // Add auth, unless an explicit Authorization header wins
        if !request.has_header(AUTHORIZATION.as_str()) {
            if let Some(value) = request.auth.header_value() {
                req_builder = req_builder.header(AUTHORIZATION, value);
            }
        }

        // Add body
        match &request.body {
            None | Some(Value::Null) => {}
            Some(Value::String(text)) => {
                req_builder = req_builder.body(text.clone());
            }
            Some(structured @ (Value::Object(_) | Value::Array(_))) => {
                if !request.has_header(CONTENT_TYPE.as_str()) {
                    req_builder = req_builder.header(CONTENT_TYPE, "application/json");
                }
                req_builder = req_builder.body(structured.to_string());
            }
            Some(scalar) => {
                req_builder = req_builder.body(scalar.to_string());
            }
        }

        Ok(req_builder)
    }
}

/// Repeated headers are joined with ", "
fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    out
}

/// Best-effort structured parse driven by the content type. Without a
/// content type, JSON is attempted.
pub fn parse_structured(content_type: Option<&str>, body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        return None;
    }
    let content_type = content_type.map(|c| c.to_ascii_lowercase());
    match content_type.as_deref() {
        Some(ct) if ct.contains("json") => serde_json::from_str(body).ok(),
        Some(ct) if ct.contains("yaml") || ct.contains("yml") => serde_yaml::from_str(body).ok(),
        Some(_) => None,
        None => serde_json::from_str(body).ok(),
    }
}

/// Create an HTTP client with the given timeout
pub fn create_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("apidash/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_structured_json() {
        assert_eq!(
            parse_structured(Some("application/json; charset=utf-8"), r#"{"ok":true}"#),
            Some(json!({"ok": true}))
        );
        assert_eq!(
            parse_structured(Some("application/problem+json"), r#"{"title":"x"}"#),
            Some(json!({"title": "x"}))
        );
        assert_eq!(parse_structured(Some("application/json"), "not json"), None);
    }

    #[test]
    fn test_parse_structured_yaml() {
        assert_eq!(
            parse_structured(Some("application/x-yaml"), "name: ada\ncount: 2\n"),
            Some(json!({"name": "ada", "count": 2}))
        );
    }

    #[test]
    fn test_parse_structured_other_types() {
        assert_eq!(parse_structured(Some("text/html"), "{\"a\":1}"), None);
        assert_eq!(parse_structured(None, "[1,2]"), Some(json!([1, 2])));
        assert_eq!(parse_structured(None, "   "), None);
    }

    #[test]
    fn test_flatten_headers_joins_repeats() {
        let mut headers = HeaderMap::new();
        headers.append("set-cookie", "a=1".parse().unwrap());
        headers.append("set-cookie", "b=2".parse().unwrap());
        headers.insert("content-type", "text/plain".parse().unwrap());
        let flat = flatten_headers(&headers);
        assert_eq!(flat["set-cookie"], "a=1, b=2");
        assert_eq!(flat["content-type"], "text/plain");
    }

    #[test]
    fn test_pretty_body() {
        let result = ExecutionResult {
            method: HttpMethod::GET,
            url: "http://x".into(),
            final_url: None,
            status: Some(200),
            headers: BTreeMap::new(),
            body: r#"{"a":1}"#.into(),
            structured: Some(json!({"a": 1})),
            elapsed_ms: 1,
            size_bytes: 7,
            error: None,
        };
        assert_eq!(result.pretty_body(), "{\n  \"a\": 1\n}");
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_invalid_url_is_reported_not_raised() {
        let executor = Executor::new(Duration::from_secs(1));
        let request = RequestSpec::new(HttpMethod::GET, "{{base_url}}/users");
        let result = executor.execute(&request).await;
        assert!(result.is_failure());
        assert!(result.error.unwrap().contains("invalid URL"));
    }
}
