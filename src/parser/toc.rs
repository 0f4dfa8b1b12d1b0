//! Nested table-of-contents documents
//!
//! ```json
//! { "toc_dictionary": {
//!     "Users": {
//!       "section": { "content_text": "Account management" },
//!       "api_endpoints": [ { "endpoint": "GET /users", "curl_command": "curl ..." } ],
//!       "children": { "Roles": { ... } }
//!     } } }
//! ```

use serde_json::{Map, Value};

use crate::curl::parse_curl;
use crate::parser::document::Collector;
use crate::parser::shape::extract_endpoint;

pub(crate) fn walk(toc: &Map<String, Value>, parent: &[String], collector: &mut Collector) {
    for (key, entry) in toc {
        let mut path = parent.to_vec();
        path.push(key.clone());

        let Some(entry) = entry.as_object() else {
            collector.ignore(path.join("/"));
            continue;
        };
        collector.branch(&path);

        let section_text = entry
            .get("section")
            .and_then(|s| s.get("content_text"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let items = entry
            .get("api_endpoints")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for (position, item) in items.iter().enumerate() {
            match extract_endpoint(item, "") {
                Ok(mut endpoint) => {
                    if endpoint.description.is_none() {
                        endpoint.description = section_text.map(String::from);
                    }
                    if endpoint.headers.is_none() {
                        endpoint.headers = item
                            .get("curl_command")
                            .and_then(Value::as_str)
                            .and_then(curl_headers);
                    }
                    collector.add(&path, endpoint);
                }
                Err(reason) => collector.skip(&path, position, reason),
            }
        }

        if let Some(children) = entry.get("children").and_then(Value::as_object) {
            walk(children, &path, collector);
        }
    }
}

/// Headers of a sample cURL command as a JSON object, `Authorization`
/// included
fn curl_headers(command: &str) -> Option<Value> {
    let request = parse_curl(command).ok()?;
    let mut headers: Map<String, Value> = request
        .header_map()
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    if let Some(value) = request.auth.header_value() {
        headers.insert("Authorization".into(), Value::String(value));
    }
    (!headers.is_empty()).then_some(Value::Object(headers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::models::ShapeKind;
    use serde_json::json;

    #[test]
    fn test_walk_nested_sections() {
        let toc = json!({
            "Users": {
                "section": {"content_text": "Account management"},
                "api_endpoints": [
                    {
                        "endpoint": "GET /users",
                        "curl_command": "curl -H 'Accept: application/json' {{base_url}}/users"
                    },
                    {"request_body": {}}
                ],
                "children": {
                    "Roles": {
                        "api_endpoints": [{"endpoint": "POST /users/{{id}}/roles", "request_body": {"role": "admin"}}]
                    }
                }
            },
            "Intro": {"section": {"content_text": "Read me"}}
        });

        let mut c = Collector::new();
        walk(toc.as_object().unwrap(), &[], &mut c);
        let doc = c.finish(ShapeKind::TocDictionary);

        assert_eq!(doc.endpoints.len(), 2);
        let list = &doc.endpoints[0];
        assert_eq!(list.category, "Users");
        assert_eq!(list.description.as_deref(), Some("Account management"));
        assert_eq!(list.headers, Some(json!({"Accept": "application/json"})));

        let roles = &doc.endpoints[1];
        assert_eq!(roles.category, "Users > Roles");
        assert_eq!(roles.method, "POST");
        assert_eq!(roles.body, Some(json!({"role": "admin"})));

        assert_eq!(
            doc.warnings[0],
            crate::parser::models::ParseWarning::SkippedEndpoint {
                category: "Users".into(),
                position: 1,
                reason: "missing path".into()
            }
        );
        let labels: Vec<_> = doc.tree.children.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["Users", "Intro"]);
        let users = doc.tree.child("Users").unwrap();
        assert!(users.children[0].is_leaf());
        assert_eq!(users.children[1].label, "Roles");
    }

    #[test]
    fn test_curl_auth_becomes_sample_header() {
        let toc = json!({
            "Orders": {
                "api_endpoints": [
                    {
                        "endpoint": "GET /orders",
                        "curl_command": "curl -H \"Authorization: Bearer {{token}}\" -H \"Accept: application/json\" {{base_url}}/orders"
                    },
                    {
                        "endpoint": "DELETE /orders/{{id}}",
                        "curl_command": "curl -X DELETE -u admin:secret {{base_url}}/orders/{{id}}"
                    }
                ]
            }
        });

        let mut c = Collector::new();
        walk(toc.as_object().unwrap(), &[], &mut c);
        let doc = c.finish(ShapeKind::TocDictionary);

        let list = &doc.endpoints[0];
        assert_eq!(
            list.headers,
            Some(json!({"Accept": "application/json", "Authorization": "Bearer {{token}}"}))
        );
        let request = list.to_request("base_url").unwrap();
        assert!(request.has_header("authorization"));

        let delete = &doc.endpoints[1];
        assert_eq!(
            delete.headers,
            Some(json!({"Authorization": "Basic YWRtaW46c2VjcmV0"}))
        );
    }
}
