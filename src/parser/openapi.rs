//! OpenAPI-style `paths` mapping

use serde_json::{Map, Value};

use crate::constants::ROOT_CATEGORY;
use crate::parser::models::{Endpoint, ParseWarning};
use crate::parser::shape::{first_segment, string_list};

/// Document-level metadata from `info` and `servers`
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct ApiInfo {
    pub title: Option<String>,
    pub version: Option<String>,
    pub base_url: Option<String>,
}

pub(crate) fn parse_info(spec: &Value) -> ApiInfo {
    let mut info = ApiInfo::default();

    if let Some(meta) = spec.get("info") {
        info.title = meta.get("title").and_then(|v| v.as_str()).map(String::from);
        info.version = meta.get("version").and_then(|v| v.as_str()).map(String::from);
    }

    // OpenAPI 3 servers, else Swagger 2 host/basePath
    if let Some(servers) = spec.get("servers").and_then(|s| s.as_array()) {
        info.base_url = servers
            .first()
            .and_then(|s| s.get("url"))
            .and_then(|v| v.as_str())
            .map(String::from);
    } else if let Some(host) = spec.get("host").and_then(|h| h.as_str()) {
        let scheme = spec
            .get("schemes")
            .and_then(|s| s.as_array())
            .and_then(|s| s.first())
            .and_then(|s| s.as_str())
            .unwrap_or("https");
        let base_path = spec.get("basePath").and_then(|b| b.as_str()).unwrap_or("");
        info.base_url = Some(format!("{}://{}{}", scheme, host, base_path));
    }

    info
}

/// Walks `path -> method -> operation`. Keys that are not HTTP methods
/// (`parameters`, `summary`, vendor extensions) are skipped.
pub(crate) fn parse_paths(paths: &Map<String, Value>) -> (Vec<Endpoint>, Vec<ParseWarning>) {
    let mut endpoints = Vec::new();
    let mut warnings = Vec::new();

    for (path, methods) in paths {
        let Some(methods_obj) = methods.as_object() else {
            warnings.push(ParseWarning::IgnoredEntry { key: path.clone() });
            continue;
        };
        let shared_params = methods_obj.get("parameters").and_then(|p| p.as_array());

        for (method, operation) in methods_obj {
            if !is_http_method(method) {
                continue;
            }

            let mut endpoint = Endpoint::new(method.as_str(), path.as_str());

            if let Some(op) = operation.as_object() {
                let summary = op.get("summary").and_then(|v| v.as_str()).map(String::from);
                let operation_id = op.get("operationId").and_then(|v| v.as_str()).map(String::from);
                endpoint.description = op
                    .get("description")
                    .and_then(|v| v.as_str())
                    .map(String::from)
                    .or_else(|| summary.clone());
                endpoint.name = summary.or(operation_id);
                endpoint.tags = string_list(op.get("tags"));

                let mut params: Vec<&Value> = op
                    .get("parameters")
                    .and_then(|p| p.as_array())
                    .map(|p| p.iter().collect())
                    .unwrap_or_default();
                // Path-level parameters, unless overridden by name
                for shared in shared_params.into_iter().flatten() {
                    let name = shared.get("name");
                    if !params.iter().any(|p| p.get("name") == name) {
                        params.push(shared);
                    }
                }
                endpoint.query = collect_params(&params, "query");
                endpoint.headers = collect_params(&params, "header");

                endpoint.body = op.get("requestBody").and_then(request_body_example);
                endpoint.responses = op.get("responses").cloned();
            }

            endpoint.category = endpoint
                .tags
                .first()
                .cloned()
                .or_else(|| first_segment(&endpoint.path))
                .unwrap_or_else(|| ROOT_CATEGORY.to_string());

            endpoints.push(endpoint);
        }
    }

    (endpoints, warnings)
}

fn is_http_method(s: &str) -> bool {
    matches!(
        s.to_lowercase().as_str(),
        "get" | "post" | "put" | "patch" | "delete" | "head" | "options"
    )
}

/// Parameters of one location as a sample object. Required parameters
/// without a default become `{{name}}` tokens; optional ones without a
/// default are left out.
fn collect_params(params: &[&Value], location: &str) -> Option<Value> {
    let mut out = Map::new();
    for param in params {
        if param.get("in").and_then(|v| v.as_str()) != Some(location) {
            continue;
        }
        let Some(name) = param.get("name").and_then(|v| v.as_str()) else {
            continue;
        };
        let default = param
            .get("example")
            .or_else(|| param.get("schema").and_then(|s| s.get("default")))
            .or_else(|| param.get("default"))
            .cloned();
        let required = param.get("required").and_then(|r| r.as_bool()).unwrap_or(false);

        match default {
            Some(value) => {
                out.insert(name.to_string(), value);
            }
            None if required => {
                out.insert(name.to_string(), Value::String(format!("{{{{{}}}}}", name)));
            }
            None => {}
        }
    }
    (!out.is_empty()).then_some(Value::Object(out))
}

/// Example payload of a request body, preferring `application/json`
fn request_body_example(body: &Value) -> Option<Value> {
    let content = body.get("content")?.as_object()?;
    let media = content
        .get("application/json")
        .or_else(|| content.values().next())?;

    media
        .get("example")
        .or_else(|| media.get("schema").and_then(|s| s.get("example")))
        .or_else(|| {
            media
                .get("examples")
                .and_then(|e| e.as_object())
                .and_then(|e| e.values().next())
                .and_then(|e| e.get("value"))
        })
        .cloned()
}
