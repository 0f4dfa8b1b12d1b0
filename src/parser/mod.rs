//! Document parser
//!
//! Turns an uploaded JSON document into a flat endpoint list and a
//! navigation tree. The walk is schema-tolerant: entries it cannot use are
//! dropped with a [`ParseWarning`] and only unparseable text is an error.
//!
//! Supported layouts:
//! - category map: `{ "Users": [ {endpoint}, ... ], ... }`, nested objects are nested categories
//! - endpoint list: `{ "endpoints": [ {endpoint}, ... ] }` (a mapping under `endpoints` is a category map)
//! - OpenAPI paths: `{ "paths": { "/users": { "get": {...} } } }`
//! - table of contents: `{ "toc_dictionary": { ... } }`

mod document;
pub mod models;
mod openapi;
mod shape;
mod toc;

pub use document::{DocumentStats, ParsedDocument};
pub use models::{Endpoint, NavigationNode, ParseWarning, ShapeKind};
pub use shape::{classify, DocumentShape};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::constants::PATHS_KEY;
use crate::error::ParseError;
use document::Collector;
use shape::{category_for, contains_endpoint_list, extract_endpoint};

/// Parses JSON text. Fails only when the text is not JSON.
pub fn parse_str(text: &str) -> Result<ParsedDocument, ParseError> {
    let doc: Value = serde_json::from_str(text)?;
    Ok(parse_value(&doc))
}

/// Parses an already decoded document. Never fails.
pub fn parse_value(doc: &Value) -> ParsedDocument {
    let mut collector = Collector::new();

    let kind = match classify(doc) {
        DocumentShape::CategoryMap(map) => {
            walk_categories(map, &[], &mut collector);
            ShapeKind::CategoryMap
        }
        DocumentShape::EndpointListUnderKey { key, value } => match value {
            Value::Array(items) => {
                walk_list(key, items, &mut collector);
                ShapeKind::EndpointList
            }
            Value::Object(paths) if key == PATHS_KEY => {
                let (endpoints, warnings) = openapi::parse_paths(paths);
                for endpoint in endpoints {
                    let category = vec![endpoint.category.clone()];
                    collector.add(&category, endpoint);
                }
                collector.warnings.extend(warnings);
                ShapeKind::PathMap
            }
            Value::Object(categories) => {
                walk_categories(categories, &[], &mut collector);
                ShapeKind::CategoryMap
            }
            _ => ShapeKind::Unrecognized,
        },
        DocumentShape::TocDictionary(entries) => {
            toc::walk(entries, &[], &mut collector);
            ShapeKind::TocDictionary
        }
        DocumentShape::Unrecognized => ShapeKind::Unrecognized,
    };

    if kind == ShapeKind::Unrecognized {
        collector.warnings.push(ParseWarning::UnrecognizedShape);
    }

    let mut parsed = collector.finish(kind);
    let meta = openapi::parse_info(doc);
    parsed.title = meta.title;
    parsed.version = meta.version;
    parsed.base_url = meta.base_url;

    let stats = parsed.stats();
    info!(
        shape = kind.as_str(),
        endpoints = stats.endpoints,
        categories = stats.categories,
        warnings = parsed.warnings.len(),
        "parsed documentation"
    );
    for warning in &parsed.warnings {
        warn!(%warning, "documentation parse notice");
    }

    parsed
}

/// `{ category: [endpoints] | { nested category } }`
fn walk_categories(map: &Map<String, Value>, parent: &[String], collector: &mut Collector) {
    for (key, value) in map {
        let mut path = parent.to_vec();
        path.push(key.clone());

        match value {
            Value::Array(items) if items.iter().any(Value::is_object) => {
                collector.branch(&path);
                for (position, item) in items.iter().enumerate() {
                    match extract_endpoint(item, "") {
                        Ok(endpoint) => collector.add(&path, endpoint),
                        Err(reason) => collector.skip(&path, position, reason),
                    }
                }
            }
            // An empty list is a category without endpoints yet
            Value::Array(items) if items.is_empty() => collector.branch(&path),
            Value::Object(inner) if contains_endpoint_list(inner) => {
                walk_categories(inner, &path, collector);
            }
            _ => {
                debug!(key = %key, "ignoring non-endpoint member");
                collector.ignore(path.join("/"));
            }
        }
    }
}

/// `{ "endpoints": [ ... ] }`: each endpoint picks its own category
fn walk_list(key: &str, items: &[Value], collector: &mut Collector) {
    for (position, item) in items.iter().enumerate() {
        match extract_endpoint(item, "") {
            Ok(endpoint) => {
                let category = vec![category_for(item, &endpoint)];
                collector.add(&category, endpoint);
            }
            Err(reason) => collector.skip(&[key.to_string()], position, reason),
        }
    }
}
