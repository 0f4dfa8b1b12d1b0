//! Parse result: flat endpoint list, navigation tree and lookups over them

use serde::Serialize;

use crate::constants::CATEGORY_SEPARATOR;
use crate::parser::models::{Endpoint, NavigationNode, ParseWarning, ShapeKind};

/// Everything derived from one source document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedDocument {
    pub shape: ShapeKind,
    /// Endpoints in source order
    pub endpoints: Vec<Endpoint>,
    pub tree: NavigationNode,
    pub warnings: Vec<ParseWarning>,
    pub title: Option<String>,
    pub version: Option<String>,
    /// Server URL declared by the document, if any
    pub base_url: Option<String>,
}

/// Endpoint and category counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    pub endpoints: usize,
    pub categories: usize,
}

impl ParsedDocument {
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Case-insensitive substring match on method, path, category, name and
    /// description. An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<&Endpoint> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.endpoints.iter().collect();
        }
        self.endpoints
            .iter()
            .filter(|e| {
                let fields = [
                    Some(e.method.as_str()),
                    Some(e.path.as_str()),
                    Some(e.category.as_str()),
                    e.name.as_deref(),
                    e.description.as_deref(),
                ];
                fields
                    .into_iter()
                    .flatten()
                    .any(|f| f.to_lowercase().contains(&query))
            })
            .collect()
    }

    /// Distinct categories, in first-seen order
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for endpoint in &self.endpoints {
            if !seen.contains(&endpoint.category.as_str()) {
                seen.push(&endpoint.category);
            }
        }
        seen
    }

    pub fn endpoints_in(&self, category: &str) -> Vec<&Endpoint> {
        self.endpoints
            .iter()
            .filter(|e| e.category == category)
            .collect()
    }

    pub fn find(&self, method: &str, path: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.matches(method, path))
    }

    pub fn stats(&self) -> DocumentStats {
        DocumentStats {
            endpoints: self.endpoints.len(),
            categories: self.tree.branch_count(),
        }
    }
}

/// Accumulates endpoints and the tree in lockstep so every extracted
/// endpoint is exactly one leaf
#[derive(Debug)]
pub(crate) struct Collector {
    pub endpoints: Vec<Endpoint>,
    pub tree: NavigationNode,
    pub warnings: Vec<ParseWarning>,
}

impl Collector {
    pub fn new() -> Self {
        Collector {
            endpoints: Vec::new(),
            tree: NavigationNode::root(),
            warnings: Vec::new(),
        }
    }

    /// Makes sure the branch exists, even when it ends up without leaves
    pub fn branch(&mut self, path: &[String]) {
        self.tree.branch_mut(path);
    }

    /// Files `endpoint` under `path`; its category becomes the joined path
    pub fn add(&mut self, path: &[String], mut endpoint: Endpoint) {
        endpoint.category = path.join(CATEGORY_SEPARATOR);
        self.tree.branch_mut(path).push_leaf(endpoint.clone());
        self.endpoints.push(endpoint);
    }

    pub fn skip(&mut self, path: &[String], position: usize, reason: &str) {
        self.warnings.push(ParseWarning::SkippedEndpoint {
            category: path.join(CATEGORY_SEPARATOR),
            position,
            reason: reason.to_string(),
        });
    }

    pub fn ignore(&mut self, key: impl Into<String>) {
        self.warnings.push(ParseWarning::IgnoredEntry { key: key.into() });
    }

    pub fn finish(self, shape: ShapeKind) -> ParsedDocument {
        let mut warnings = self.warnings;
        if shape != ShapeKind::Unrecognized && self.endpoints.is_empty() {
            warnings.push(ParseWarning::NoEndpoints);
        }
        ParsedDocument {
            shape,
            endpoints: self.endpoints,
            tree: self.tree,
            warnings,
            title: None,
            version: None,
            base_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> ParsedDocument {
        let mut c = Collector::new();
        let users = vec!["Users".to_string()];
        let mut list = Endpoint::new("GET", "/users");
        list.description = Some("List every account".into());
        c.add(&users, list);
        c.add(&users, Endpoint::new("post", "/users"));
        let mut health = Endpoint::new("GET", "/health");
        health.name = Some("Liveness".into());
        c.add(&["Ops".to_string(), "Probes".to_string()], health);
        c.branch(&["Empty".to_string()]);
        c.finish(ShapeKind::CategoryMap)
    }

    #[test]
    fn test_categories_first_seen() {
        let d = doc();
        assert_eq!(d.categories(), vec!["Users", "Ops > Probes"]);
        assert_eq!(d.endpoints_in("Users").len(), 2);
        assert_eq!(d.stats(), DocumentStats { endpoints: 3, categories: 4 });
        assert_eq!(d.tree.leaf_count(), d.endpoints.len());
    }

    #[test]
    fn test_search() {
        let d = doc();
        assert_eq!(d.search("").len(), 3);
        assert_eq!(d.search("ACCOUNT").len(), 1);
        assert_eq!(d.search("post").len(), 1);
        assert_eq!(d.search("probes").len(), 1);
        assert_eq!(d.search("liveness")[0].path, "/health");
        assert!(d.search("nothing").is_empty());
    }

    #[test]
    fn test_find() {
        let d = doc();
        assert!(d.find("post", "/users").is_some());
        assert!(d.find("DELETE", "/users").is_none());
    }

    #[test]
    fn test_empty_recognized_shape_warns() {
        let d = Collector::new().finish(ShapeKind::EndpointList);
        assert_eq!(d.warnings, vec![ParseWarning::NoEndpoints]);
        let d = Collector::new().finish(ShapeKind::Unrecognized);
        assert!(d.warnings.is_empty());
    }
}
