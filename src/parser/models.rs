//! Data models for parsed endpoints and the navigation tree

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::ValidationError;
use crate::models::{Header, RequestSpec};

/// One documented API operation
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Endpoint {
    /// HTTP method, uppercased
    pub method: String,
    /// Path or URL template (e.g., "/users/{{id}}")
    pub path: String,
    /// Flat category path, nested labels joined with " > "
    pub category: String,
    /// Operation name, title or operationId
    pub name: Option<String>,
    pub description: Option<String>,
    /// Tags for grouping
    pub tags: Vec<String>,
    /// Sample headers, verbatim
    pub headers: Option<Value>,
    /// Body template, verbatim
    pub body: Option<Value>,
    /// Sample query parameters, verbatim
    pub query: Option<Value>,
    /// Documented responses, verbatim
    pub responses: Option<Value>,
}

impl Endpoint {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Endpoint {
            method: method.into().trim().to_uppercase(),
            path: path.into(),
            category: String::new(),
            name: None,
            description: None,
            tags: Vec::new(),
            headers: None,
            body: None,
            query: None,
            responses: None,
        }
    }

    /// "GET /users"
    pub fn signature(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// Returns display title for the endpoint
    pub fn display_title(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.signature())
    }

    /// Method comparison is case-insensitive, path comparison is exact
    pub fn matches(&self, method: &str, path: &str) -> bool {
        self.method.eq_ignore_ascii_case(method.trim()) && self.path == path
    }

    /// Sample headers as a header list. Accepts an object or a list of
    /// `{key, value}` / `"Name: value"` items.
    pub fn header_list(&self) -> Vec<Header> {
        let Some(headers) = &self.headers else {
            return Vec::new();
        };
        match headers {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| Header::new(k.clone(), scalar_text(v)))
                .collect(),
            Value::Array(items) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Header::parse(s).ok(),
                    Value::Object(obj) => {
                        let key = obj.get("key").or_else(|| obj.get("name"))?.as_str()?;
                        let value = obj.get("value").map(scalar_text).unwrap_or_default();
                        let mut header = Header::new(key, value);
                        header.enabled = !obj
                            .get("disabled")
                            .and_then(Value::as_bool)
                            .unwrap_or(false);
                        Some(header)
                    }
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Sample query parameters as pairs, same accepted forms as headers
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let Some(query) = &self.query else {
            return Vec::new();
        };
        match query {
            Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), scalar_text(v))).collect(),
            Value::Array(items) => items
                .iter()
                .filter_map(|item| {
                    let obj = item.as_object()?;
                    if obj.get("disabled").and_then(Value::as_bool).unwrap_or(false) {
                        return None;
                    }
                    let key = obj.get("key").or_else(|| obj.get("name"))?.as_str()?;
                    let value = obj
                        .get("value")
                        .or_else(|| obj.get("default"))
                        .map(scalar_text)
                        .unwrap_or_default();
                    Some((key.to_string(), value))
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Builds an unresolved request. Relative paths get the `{{base_url_variable}}`
    /// token prefixed so the active environment supplies the host.
    pub fn to_request(&self, base_url_variable: &str) -> Result<RequestSpec, ValidationError> {
        let method = self.method.parse()?;
        let url = if self.path.starts_with("http://")
            || self.path.starts_with("https://")
            || self.path.starts_with("{{")
        {
            self.path.clone()
        } else if self.path.starts_with('/') {
            format!("{{{{{}}}}}{}", base_url_variable, self.path)
        } else {
            format!("{{{{{}}}}}/{}", base_url_variable, self.path)
        };

        let mut request = RequestSpec::new(method, url);
        request.headers = self.header_list();
        request.query = self.query_pairs();
        request.body = self.body.clone().filter(|b| !b.is_null());
        Ok(request)
    }
}

/// Strings verbatim, everything else as compact JSON
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// One node of the browse tree. The root has no endpoint; leaves carry one.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NavigationNode {
    pub label: String,
    pub children: Vec<NavigationNode>,
    pub endpoint: Option<Endpoint>,
}

impl NavigationNode {
    pub fn root() -> Self {
        NavigationNode::branch("")
    }

    pub fn branch(label: impl Into<String>) -> Self {
        NavigationNode {
            label: label.into(),
            children: Vec::new(),
            endpoint: None,
        }
    }

    pub fn leaf(endpoint: Endpoint) -> Self {
        NavigationNode {
            label: endpoint.display_title(),
            children: Vec::new(),
            endpoint: Some(endpoint),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Walks to the branch at `path`, creating missing branches in
    /// first-seen order
    pub fn branch_mut(&mut self, path: &[String]) -> &mut NavigationNode {
        let mut node = self;
        for label in path {
            let idx = match node
                .children
                .iter()
                .position(|c| !c.is_leaf() && &c.label == label)
            {
                Some(i) => i,
                None => {
                    node.children.push(NavigationNode::branch(label.clone()));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[idx];
        }
        node
    }

    pub fn push_leaf(&mut self, endpoint: Endpoint) {
        self.children.push(NavigationNode::leaf(endpoint));
    }

    /// Endpoints in pre-order
    pub fn leaves(&self) -> Vec<&Endpoint> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Endpoint>) {
        if let Some(endpoint) = &self.endpoint {
            out.push(endpoint);
        }
        for child in &self.children {
            child.collect_leaves(out);
        }
    }

    pub fn leaf_count(&self) -> usize {
        usize::from(self.is_leaf()) + self.children.iter().map(|c| c.leaf_count()).sum::<usize>()
    }

    /// Branches below this node
    pub fn branch_count(&self) -> usize {
        self.children
            .iter()
            .filter(|c| !c.is_leaf())
            .map(|c| 1 + c.branch_count())
            .sum()
    }

    pub fn child(&self, label: &str) -> Option<&NavigationNode> {
        self.children.iter().find(|c| c.label == label)
    }
}

/// Which document layout the parser recognized
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    /// `{ "Category": [endpoint, ...], ... }`
    CategoryMap,
    /// `{ "endpoints": [endpoint, ...] }`
    EndpointList,
    /// `{ "paths": { "/p": { "get": {...} } } }`
    PathMap,
    /// `{ "toc_dictionary": { ... } }`
    TocDictionary,
    Unrecognized,
}

impl ShapeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::CategoryMap => "category map",
            ShapeKind::EndpointList => "endpoint list",
            ShapeKind::PathMap => "path map",
            ShapeKind::TocDictionary => "table of contents",
            ShapeKind::Unrecognized => "unrecognized",
        }
    }
}

/// Non-fatal notice about a partially understood document
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    /// No recognized top-level layout
    UnrecognizedShape,
    /// Layout recognized, but nothing endpoint-like inside
    NoEndpoints,
    /// An endpoint-like entry was dropped
    SkippedEndpoint {
        category: String,
        position: usize,
        reason: String,
    },
    /// A top-level or category entry that is neither endpoints nor a category
    IgnoredEntry { key: String },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::UnrecognizedShape => write!(
                f,
                "document does not look like API documentation (expected a category map, \
                 'endpoints', 'paths' or 'toc_dictionary')"
            ),
            ParseWarning::NoEndpoints => write!(f, "no endpoints found"),
            ParseWarning::SkippedEndpoint {
                category,
                position,
                reason,
            } => write!(f, "skipped entry #{} in '{}': {}", position + 1, category, reason),
            ParseWarning::IgnoredEntry { key } => write!(f, "ignored '{}'", key),
        }
    }
}
