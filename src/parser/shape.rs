//! Document shape classification and endpoint extraction
//!
//! Shapes are matched explicitly, in a fixed order, so that every branch of
//! the parser corresponds to one [`DocumentShape`] variant.

use serde_json::{Map, Value};

use crate::constants::{ENDPOINTS_KEY, PATHS_KEY, ROOT_CATEGORY, TOC_KEY};
use crate::models::HttpMethod;
use crate::parser::models::Endpoint;

/// Recognized top-level layouts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DocumentShape<'a> {
    /// Category name -> endpoint list (nested objects are nested categories)
    CategoryMap(&'a Map<String, Value>),
    /// A conventional key holding the endpoints
    EndpointListUnderKey { key: &'static str, value: &'a Value },
    /// Nested table of contents with sections and children
    TocDictionary(&'a Map<String, Value>),
    Unrecognized,
}

/// Decides which layout `doc` follows
pub fn classify(doc: &Value) -> DocumentShape<'_> {
    let Some(map) = doc.as_object() else {
        return DocumentShape::Unrecognized;
    };

    if let Some(toc) = map.get(TOC_KEY).and_then(Value::as_object) {
        return DocumentShape::TocDictionary(toc);
    }

    for key in [ENDPOINTS_KEY, PATHS_KEY] {
        if let Some(value) = map.get(key) {
            if value.is_array() || value.is_object() {
                return DocumentShape::EndpointListUnderKey { key, value };
            }
        }
    }

    if contains_endpoint_list(map) {
        return DocumentShape::CategoryMap(map);
    }

    DocumentShape::Unrecognized
}

/// True when some member (directly or in a nested object) is a list holding objects
pub(crate) fn contains_endpoint_list(map: &Map<String, Value>) -> bool {
    map.values().any(|v| match v {
        Value::Array(items) => items.iter().any(Value::is_object),
        Value::Object(inner) => contains_endpoint_list(inner),
        _ => false,
    })
}

/// Why an endpoint-like entry was dropped
pub(crate) type SkipReason = &'static str;

/// Builds an endpoint from one entry. The path is required; everything else
/// is optional and passed through verbatim.
pub(crate) fn extract_endpoint(item: &Value, category: &str) -> Result<Endpoint, SkipReason> {
    let obj = item.as_object().ok_or("not an object")?;

    let combined = obj.get("endpoint").and_then(Value::as_str).map(split_signature);

    let path = str_field(obj, &["path", "url"])
        .map(str::to_string)
        .or_else(|| combined.as_ref().and_then(|(_, p)| p.clone()))
        .ok_or("missing path")?;

    let method = str_field(obj, &["method"])
        .map(str::to_string)
        .or_else(|| combined.and_then(|(m, _)| m))
        .unwrap_or_else(|| HttpMethod::GET.as_str().to_string());

    let mut endpoint = Endpoint::new(method, path);
    endpoint.category = category.to_string();
    endpoint.name = str_field(obj, &["name", "title", "operationId"]).map(str::to_string);
    endpoint.description = str_field(obj, &["description", "summary"]).map(str::to_string);
    endpoint.tags = string_list(obj.get("tags"));
    endpoint.headers = obj.get("headers").cloned();
    endpoint.body = ["body", "request_body", "body_template"]
        .iter()
        .find_map(|k| obj.get(*k))
        .cloned();
    endpoint.query = ["query", "query_params", "params"]
        .iter()
        .find_map(|k| obj.get(*k))
        .cloned();
    endpoint.responses = obj.get("responses").cloned();

    Ok(endpoint)
}

/// Splits "POST /users" into method and path. A string without a known
/// method prefix is all path.
pub(crate) fn split_signature(s: &str) -> (Option<String>, Option<String>) {
    let s = s.trim();
    if s.is_empty() {
        return (None, None);
    }
    match s.split_once(char::is_whitespace) {
        Some((head, rest)) if head.parse::<HttpMethod>().is_ok() => {
            let rest = rest.trim();
            (
                Some(head.to_uppercase()),
                (!rest.is_empty()).then(|| rest.to_string()),
            )
        }
        _ if s.parse::<HttpMethod>().is_ok() => (Some(s.to_uppercase()), None),
        _ => (None, Some(s.to_string())),
    }
}

/// Category of an endpoint from a flat list: declared category, first tag,
/// first literal path segment, or "root"
pub(crate) fn category_for(item: &Value, endpoint: &Endpoint) -> String {
    item.get("category")
        .and_then(Value::as_str)
        .filter(|c| !c.trim().is_empty())
        .map(str::to_string)
        .or_else(|| endpoint.tags.first().cloned())
        .or_else(|| first_segment(&endpoint.path))
        .unwrap_or_else(|| ROOT_CATEGORY.to_string())
}

/// First path segment that is neither a template token nor a path parameter,
/// with any scheme and host removed
pub(crate) fn first_segment(path: &str) -> Option<String> {
    let path = path.split(['?', '#']).next().unwrap_or("");
    let path = match path.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, p)| p).unwrap_or(""),
        None => path,
    };
    path.split('/')
        .filter(|s| !s.is_empty())
        .find(|s| !(s.starts_with('{') || s.starts_with(':')))
        .map(str::to_string)
}

fn str_field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|t| t.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
