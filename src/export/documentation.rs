//! Documentation exports: raw JSON, Postman collection, Markdown reference, report

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

use super::anchor;
use crate::constants::{APP_NAME, POSTMAN_COLLECTION_SCHEMA};
use crate::models::Documentation;
use crate::parser::{Endpoint, ParsedDocument};

/// The stored source document, verbatim
pub fn to_json(doc: &Documentation) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&doc.content)
}

/// Postman v2.1 collection with one folder per category. Relative paths are
/// rooted at `{{base_url_variable}}`.
pub fn to_postman(
    doc: &Documentation,
    parsed: &ParsedDocument,
    base_url_variable: &str,
    now: DateTime<Utc>,
) -> Value {
    let base_token = format!("{{{{{}}}}}", base_url_variable);

    let folders: Vec<Value> = parsed
        .categories()
        .into_iter()
        .map(|category| {
            let items: Vec<Value> = parsed
                .endpoints_in(category)
                .into_iter()
                .map(|endpoint| postman_item(endpoint, &base_token))
                .collect();
            json!({
                "name": category,
                "description": format!("All endpoints related to {}", category),
                "item": items,
            })
        })
        .collect();

    json!({
        "info": {
            "_postman_id": uuid::Uuid::new_v4().to_string(),
            "name": format!("{} API Collection", doc.name),
            "description": format!(
                "Exported from {}\nSource: {}\nExported: {}",
                APP_NAME,
                doc.source_identifier.as_deref().unwrap_or("unknown"),
                now.format("%Y-%m-%d %H:%M:%S")
            ),
            "schema": POSTMAN_COLLECTION_SCHEMA,
        },
        "item": folders,
        "variable": [
            {
                "key": base_url_variable,
                "value": parsed.base_url.clone().unwrap_or_default(),
                "type": "string",
            }
        ],
    })
}

fn postman_item(endpoint: &Endpoint, base_token: &str) -> Value {
    let absolute = endpoint.path.starts_with("http://")
        || endpoint.path.starts_with("https://")
        || endpoint.path.starts_with("{{");
    let raw = if absolute {
        endpoint.path.clone()
    } else {
        format!("{}/{}", base_token, endpoint.path.trim_start_matches('/'))
    };

    let path_part = endpoint.path.split('?').next().unwrap_or("");
    let segments: Vec<&str> = path_part
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let mut url = json!({"raw": raw});
    if !absolute {
        url["host"] = json!([base_token]);
        url["path"] = json!(segments);
    }
    let query: Vec<Value> = endpoint
        .query_pairs()
        .into_iter()
        .map(|(k, v)| json!({"key": k, "value": v}))
        .collect();
    if !query.is_empty() {
        url["query"] = json!(query);
    }

    let headers: Vec<Value> = endpoint
        .header_list()
        .into_iter()
        .map(|h| json!({"key": h.key, "value": h.value, "type": "text", "disabled": !h.enabled}))
        .collect();

    let mut request = json!({
        "method": endpoint.method,
        "header": headers,
        "url": url,
        "description": endpoint.description.clone().unwrap_or_default(),
    });

    match &endpoint.body {
        None | Some(Value::Null) => {}
        Some(Value::String(text)) => {
            request["body"] = json!({"mode": "raw", "raw": text});
        }
        Some(body) => {
            let raw = serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string());
            request["body"] = json!({
                "mode": "raw",
                "raw": raw,
                "options": {"raw": {"language": "json"}},
            });
        }
    }

    json!({
        "name": endpoint.display_title(),
        "request": request,
        "response": [],
    })
}

/// Markdown reference grouped by category, with a linked table of contents
pub fn to_markdown(doc: &Documentation, parsed: &ParsedDocument, now: DateTime<Utc>) -> String {
    let categories = parsed.categories();
    let mut out = String::new();

    let _ = writeln!(out, "# {} API Documentation\n", doc.name);
    let _ = writeln!(out, "**Generated on:** {}  ", now.format("%Y-%m-%d %H:%M:%S"));
    if let Some(source) = &doc.source_identifier {
        let _ = writeln!(out, "**Source:** {}  ", source);
    }
    if let Some(base_url) = &parsed.base_url {
        let _ = writeln!(out, "**Base URL:** {}  ", base_url);
    }
    let _ = writeln!(out, "**Total Endpoints:** {}  ", parsed.endpoints.len());
    let _ = writeln!(out, "**Categories:** {}\n", categories.len());
    let _ = writeln!(out, "---\n\n## Table of Contents\n");

    for category in &categories {
        let endpoints = parsed.endpoints_in(category);
        let _ = writeln!(
            out,
            "- [{}](#{}) ({} endpoints)",
            category,
            anchor(category),
            endpoints.len()
        );
        for endpoint in endpoints {
            let signature = endpoint.signature();
            let _ = writeln!(out, "  - [{}](#{})", signature, anchor(&signature));
        }
    }

    for category in &categories {
        let _ = writeln!(out, "\n---\n\n## {}\n", category);

        for endpoint in parsed.endpoints_in(category) {
            let _ = writeln!(out, "### {}\n", endpoint.signature());
            if let Some(name) = &endpoint.name {
                let _ = writeln!(out, "**{}**\n", name);
            }
            let _ = writeln!(
                out,
                "{}\n",
                endpoint.description.as_deref().unwrap_or("No description available")
            );

            let headers = endpoint.header_list();
            if !headers.is_empty() {
                let _ = writeln!(out, "**Headers:**\n```");
                for h in headers {
                    let _ = writeln!(out, "{}: {}", h.key, h.value);
                }
                let _ = writeln!(out, "```\n");
            }

            let query = endpoint.query_pairs();
            if !query.is_empty() {
                let _ = writeln!(out, "**Query parameters:**\n");
                for (k, v) in query {
                    let _ = writeln!(out, "- `{}` = `{}`", k, v);
                }
                let _ = writeln!(out);
            }

            if let Some(body) = endpoint.body.as_ref().filter(|b| !b.is_null()) {
                let body = match body {
                    Value::String(s) => s.clone(),
                    other => serde_json::to_string_pretty(other).unwrap_or_default(),
                };
                let _ = writeln!(out, "**Request Body:**\n```json\n{}\n```\n", body);
            }

            if let Some(responses) = endpoint.responses.as_ref().and_then(Value::as_object) {
                let _ = writeln!(out, "#### Responses\n");
                for (code, response) in responses {
                    let description = response
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or("");
                    let _ = writeln!(out, "- **{}** {}", code, description);
                    if let Some(example) = response.get("example") {
                        let pretty = serde_json::to_string_pretty(example).unwrap_or_default();
                        let _ = writeln!(out, "\n```json\n{}\n```", pretty);
                    }
                }
                let _ = writeln!(out);
            }
        }
    }

    let _ = writeln!(out, "\n---\n\n## Documentation Metadata\n");
    let _ = writeln!(out, "- **Document:** {} (id {})", doc.name, doc.id);
    let _ = writeln!(out, "- **Uploaded:** {}", doc.uploaded_at.to_rfc3339_opts(SecondsFormat::Secs, true));
    let _ = writeln!(out, "- **Last modified:** {}", doc.last_modified.to_rfc3339_opts(SecondsFormat::Secs, true));
    out
}

/// Counts by method and category plus the endpoint list
pub fn report(doc: &Documentation, parsed: &ParsedDocument, now: DateTime<Utc>) -> Value {
    let mut methods: BTreeMap<&str, usize> = BTreeMap::new();
    for endpoint in &parsed.endpoints {
        *methods.entry(endpoint.method.as_str()).or_default() += 1;
    }
    let by_category: Vec<Value> = parsed
        .categories()
        .into_iter()
        .map(|c| json!({"name": c, "endpoints": parsed.endpoints_in(c).len()}))
        .collect();
    let stats = parsed.stats();

    json!({
        "summary": {
            "document": doc.name,
            "shape": parsed.shape,
            "total_endpoints": stats.endpoints,
            "total_categories": stats.categories,
            "methods_count": methods,
            "export_date": now.to_rfc3339_opts(SecondsFormat::Secs, true),
        },
        "categories": by_category,
        "warnings": parsed.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "endpoints": parsed.endpoints,
    })
}
