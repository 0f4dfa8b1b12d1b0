use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// HTTP Method enum
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
    HEAD,
    OPTIONS,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::GET,
        HttpMethod::POST,
        HttpMethod::PUT,
        HttpMethod::PATCH,
        HttpMethod::DELETE,
        HttpMethod::HEAD,
        HttpMethod::OPTIONS,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == upper)
            .ok_or_else(|| ValidationError::UnknownMethod(s.to_string()))
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication type
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum AuthType {
    #[default]
    None,
    Bearer(String),
    Basic {
        username: String,
        password: String,
    },
}

impl AuthType {
    /// Value of the `Authorization` header this auth produces
    pub fn header_value(&self) -> Option<String> {
        match self {
            AuthType::None => None,
            AuthType::Bearer(token) => Some(format!("Bearer {}", token)),
            AuthType::Basic { username, password } => {
                let credentials = format!("{}:{}", username, password);
                Some(format!("Basic {}", BASE64.encode(credentials)))
            }
        }
    }
}

/// HTTP Header
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub key: String,
    pub value: String,
    pub enabled: bool,
}

impl Header {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Header {
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }

    /// Parses `Name: value`
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() => Ok(Header::new(key.trim(), value.trim())),
            _ => Err(ValidationError::MalformedPair {
                expected: "'Name: value'",
                input: s.to_string(),
            }),
        }
    }
}

/// Splits `key=value` as used for query parameters and variables
pub fn parse_pair(s: &str) -> Result<(String, String), ValidationError> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(ValidationError::MalformedPair {
            expected: "'key=value'",
            input: s.to_string(),
        }),
    }
}

/// A single HTTP request, before or after template resolution
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<Header>,
    #[serde(default)]
    pub query: Vec<(String, String)>,
    /// Strings are sent verbatim; objects and arrays are sent as JSON
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub auth: AuthType,
}

impl RequestSpec {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        RequestSpec {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            auth: AuthType::None,
        }
    }

    /// Enabled headers, as recorded in history
    pub fn header_map(&self) -> BTreeMap<String, String> {
        self.headers
            .iter()
            .filter(|h| h.enabled)
            .map(|h| (h.key.clone(), h.value.clone()))
            .collect()
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers
            .iter()
            .any(|h| h.enabled && h.key.eq_ignore_ascii_case(name))
    }

    /// Body as it goes over the wire; empty when there is none
    pub fn body_text(&self) -> String {
        match &self.body {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// URL with query parameters appended
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        match reqwest::Url::parse(&self.url) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                url.to_string()
            }
            Err(_) => {
                let joined = self
                    .query
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join("&");
                let sep = if self.url.contains('?') { '&' } else { '?' };
                format!("{}{}{}", self.url, sep, joined)
            }
        }
    }
}

/// Stored API documentation snapshot
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Documentation {
    pub id: i64,
    pub name: String,
    pub source_identifier: Option<String>,
    #[sqlx(json)]
    pub content: Value,
    pub uploaded_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// Named, switchable set of variables
#[derive(Clone, Debug, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct Environment {
    pub id: i64,
    pub name: String,
    pub description: String,
    #[sqlx(json)]
    pub variables: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Environment {
    pub fn get(&self, key: &str) -> Option<&String> {
        self.variables.get(key)
    }

    /// Substitutes {{variable}} patterns in text
    pub fn substitute(&self, text: &str) -> String {
        crate::template::resolve_str(text, &self.variables)
    }
}

/// Input for creating or replacing an environment
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewEnvironment {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub is_active: bool,
}

impl NewEnvironment {
    pub fn new(name: impl Into<String>) -> Self {
        NewEnvironment {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }
}

/// Response status bucket, used for history filters and display colors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    Informational,
    Success,
    Redirection,
    ClientError,
    ServerError,
    /// No response arrived
    Failed,
}

impl StatusClass {
    pub fn of(status: Option<i64>) -> Self {
        match status {
            None => StatusClass::Failed,
            Some(s) if s < 200 => StatusClass::Informational,
            Some(s) if s < 300 => StatusClass::Success,
            Some(s) if s < 400 => StatusClass::Redirection,
            Some(s) if s < 500 => StatusClass::ClientError,
            Some(_) => StatusClass::ServerError,
        }
    }

    /// Inclusive status range; `None` for failed requests
    pub fn range(&self) -> Option<(i64, i64)> {
        match self {
            StatusClass::Informational => Some((100, 199)),
            StatusClass::Success => Some((200, 299)),
            StatusClass::Redirection => Some((300, 399)),
            StatusClass::ClientError => Some((400, 499)),
            StatusClass::ServerError => Some((500, 599)),
            StatusClass::Failed => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusClass::Informational => "1xx",
            StatusClass::Success => "2xx",
            StatusClass::Redirection => "3xx",
            StatusClass::ClientError => "4xx",
            StatusClass::ServerError => "5xx",
            StatusClass::Failed => "failed",
        }
    }
}

impl FromStr for StatusClass {
    type Err = ValidationError;

    /// Accepts "2xx", "2", "success", "failed", ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1xx" | "1" | "informational" => Ok(StatusClass::Informational),
            "2xx" | "2" | "success" | "ok" => Ok(StatusClass::Success),
            "3xx" | "3" | "redirect" | "redirection" => Ok(StatusClass::Redirection),
            "4xx" | "4" | "client" | "client_error" => Ok(StatusClass::ClientError),
            "5xx" | "5" | "server" | "server_error" => Ok(StatusClass::ServerError),
            "failed" | "error" | "none" => Ok(StatusClass::Failed),
            _ => Err(ValidationError::MalformedPair {
                expected: "a status class (1xx-5xx or 'failed')",
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one executed request
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct HistoryEntry {
    pub id: i64,
    pub endpoint: String,
    pub method: String,
    #[sqlx(json)]
    pub request_headers: BTreeMap<String, String>,
    pub request_body: String,
    pub response_status: Option<i64>,
    #[sqlx(json)]
    pub response_headers: BTreeMap<String, String>,
    pub response_body: String,
    pub error: Option<String>,
    pub elapsed_ms: i64,
    pub executed_at: DateTime<Utc>,
    pub environment_id: Option<i64>,
}

impl HistoryEntry {
    pub fn is_failure(&self) -> bool {
        self.response_status.is_none()
    }

    pub fn status_class(&self) -> StatusClass {
        StatusClass::of(self.response_status)
    }
}

/// Input for appending a history entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewHistoryEntry {
    pub endpoint: String,
    pub method: String,
    pub request_headers: BTreeMap<String, String>,
    pub request_body: String,
    pub response_status: Option<i64>,
    pub response_headers: BTreeMap<String, String>,
    pub response_body: String,
    pub error: Option<String>,
    pub elapsed_ms: i64,
    pub executed_at: DateTime<Utc>,
    pub environment_id: Option<i64>,
}
