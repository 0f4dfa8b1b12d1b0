//! Plain-text rendering for the command line

use std::fmt::Write as _;

use crossterm::style::{Color, Stylize};

use crate::export::is_secret;
use crate::models::{Environment, HistoryEntry, StatusClass};
use crate::network::ExecutionResult;
use crate::parser::{Endpoint, NavigationNode, ParseWarning};

/// Status class color
pub fn status_color(class: StatusClass) -> Color {
    match class {
        StatusClass::Informational => Color::Yellow,
        StatusClass::Success => Color::Green,
        StatusClass::Redirection => Color::Cyan,
        StatusClass::ClientError => Color::Red,
        StatusClass::ServerError => Color::Magenta,
        StatusClass::Failed => Color::DarkGrey,
    }
}

/// Method color
pub fn method_color(method: &str) -> Color {
    match method {
        "GET" => Color::Green,
        "POST" => Color::Yellow,
        "PUT" => Color::Blue,
        "PATCH" => Color::Cyan,
        "DELETE" => Color::Red,
        _ => Color::White,
    }
}

/// "200 OK", "404 Not Found", "failed"
pub fn status_label(status: Option<i64>) -> String {
    match status {
        None => "failed".to_string(),
        Some(code) => {
            let reason = u16::try_from(code)
                .ok()
                .and_then(|c| reqwest::StatusCode::from_u16(c).ok())
                .and_then(|s| s.canonical_reason());
            match reason {
                Some(reason) => format!("{} {}", code, reason),
                None => code.to_string(),
            }
        }
    }
}

/// Renders records, optionally with ANSI colors
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    color: bool,
}

impl Printer {
    pub fn new(color: bool) -> Self {
        Printer { color }
    }

    pub fn plain() -> Self {
        Printer { color: false }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn strong(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        self.paint(text, Color::DarkGrey)
    }

    /// Method padded to a fixed width, then colored
    pub fn method(&self, method: &str) -> String {
        self.paint(&format!("{:<7}", method), method_color(method))
    }

    pub fn status(&self, status: Option<i64>) -> String {
        self.paint(&status_label(status), status_color(StatusClass::of(status)))
    }

    /// `GET     /users  List users`
    pub fn endpoint(&self, endpoint: &Endpoint) -> String {
        let mut line = format!("{} {}", self.method(&endpoint.method), endpoint.path);
        if let Some(name) = &endpoint.name {
            line.push_str("  ");
            line.push_str(&self.dim(name));
        }
        line
    }

    /// Full detail of one endpoint
    pub fn endpoint_detail(&self, endpoint: &Endpoint) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.strong(&endpoint.signature()));
        if let Some(name) = &endpoint.name {
            let _ = writeln!(out, "Name:        {}", name);
        }
        let _ = writeln!(out, "Category:    {}", endpoint.category);
        if let Some(description) = &endpoint.description {
            let _ = writeln!(out, "Description: {}", description);
        }
        if !endpoint.tags.is_empty() {
            let _ = writeln!(out, "Tags:        {}", endpoint.tags.join(", "));
        }
        for header in endpoint.header_list() {
            let _ = writeln!(out, "Header:      {}: {}", header.key, header.value);
        }
        for (key, value) in endpoint.query_pairs() {
            let _ = writeln!(out, "Query:       {}={}", key, value);
        }
        if let Some(body) = endpoint.body.as_ref().filter(|b| !b.is_null()) {
            let pretty = serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string());
            let _ = writeln!(out, "Body:\n{}", pretty);
        }
        out
    }

    /// Indented outline of the navigation tree
    pub fn tree(&self, root: &NavigationNode) -> String {
        let mut out = String::new();
        for child in &root.children {
            self.tree_node(child, 0, &mut out);
        }
        out
    }

    fn tree_node(&self, node: &NavigationNode, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        match &node.endpoint {
            Some(endpoint) => {
                let _ = writeln!(out, "{}{}", indent, self.endpoint(endpoint));
            }
            None => {
                let label = format!("{} ({})", node.label, node.leaf_count());
                let _ = writeln!(out, "{}{}", indent, self.strong(&label));
                for child in &node.children {
                    self.tree_node(child, depth + 1, out);
                }
            }
        }
    }

    pub fn warnings(&self, warnings: &[ParseWarning]) -> String {
        warnings
            .iter()
            .map(|w| format!("{} {}\n", self.paint("warning:", Color::Yellow), w))
            .collect()
    }

    /// Status line, headers and body of an execution
    pub fn result(&self, result: &ExecutionResult, show_headers: bool) -> String {
        let mut out = String::new();
        let status = result.status.map(i64::from);
        let _ = writeln!(
            out,
            "{} {} -> {}  {}",
            self.method(result.method.as_str()),
            result.url,
            self.status(status),
            self.dim(&format!("{} ms, {} bytes", result.elapsed_ms, result.size_bytes))
        );
        if let Some(error) = &result.error {
            let _ = writeln!(out, "{} {}", self.paint("error:", Color::Red), error);
            return out;
        }
        if let Some(final_url) = result.final_url.as_ref().filter(|u| **u != result.url) {
            let _ = writeln!(out, "{}", self.dim(&format!("redirected to {}", final_url)));
        }
        if show_headers {
            for (key, value) in &result.headers {
                let _ = writeln!(out, "{}: {}", self.dim(key), value);
            }
        }
        let body = result.pretty_body();
        if !body.is_empty() {
            let _ = writeln!(out, "\n{}", body);
        }
        out
    }

    /// One line per history entry
    pub fn history_row(&self, entry: &HistoryEntry) -> String {
        let mut line = format!(
            "{:>5}  {}  {} {}  {}  {}",
            entry.id,
            entry.executed_at.format("%Y-%m-%d %H:%M:%S"),
            self.method(&entry.method),
            entry.endpoint,
            self.status(entry.response_status),
            self.dim(&format!("{} ms", entry.elapsed_ms))
        );
        if let Some(error) = &entry.error {
            line.push_str("  ");
            line.push_str(&self.paint(error, Color::Red));
        }
        line
    }

    /// Request and response of one stored entry
    pub fn history_detail(&self, entry: &HistoryEntry) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.history_row(entry));
        if let Some(env) = entry.environment_id {
            let _ = writeln!(out, "Environment: {}", env);
        }
        let _ = writeln!(out, "\n{}", self.strong("Request"));
        for (key, value) in &entry.request_headers {
            let _ = writeln!(out, "{}: {}", key, value);
        }
        if !entry.request_body.is_empty() {
            let _ = writeln!(out, "\n{}", entry.request_body);
        }
        let _ = writeln!(out, "\n{}", self.strong("Response"));
        for (key, value) in &entry.response_headers {
            let _ = writeln!(out, "{}: {}", key, value);
        }
        if !entry.response_body.is_empty() {
            let _ = writeln!(out, "\n{}", entry.response_body);
        }
        out
    }

    /// `* dev (3 variables)`; the active environment is starred
    pub fn environment_row(&self, env: &Environment) -> String {
        let marker = if env.is_active {
            self.paint("*", Color::Green)
        } else {
            " ".to_string()
        };
        let mut line = format!(
            "{} {:>3}  {}  {}",
            marker,
            env.id,
            env.name,
            self.dim(&format!("({} variables)", env.variables.len()))
        );
        if !env.description.is_empty() {
            line.push_str("  ");
            line.push_str(&env.description);
        }
        line
    }

    /// Variables of one environment, secrets masked unless `reveal`
    pub fn environment_detail(&self, env: &Environment, reveal: bool) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.environment_row(env));
        let width = env.variables.keys().map(|k| k.len()).max().unwrap_or(0);
        for (key, value) in &env.variables {
            let shown = if !reveal && is_secret(key) { "********" } else { value.as_str() };
            let _ = writeln!(out, "  {:<width$}  {}", key, shown, width = width);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HttpMethod;
    use std::collections::BTreeMap;

    #[test]
    fn test_status_label() {
        assert_eq!(status_label(Some(200)), "200 OK");
        assert_eq!(status_label(Some(404)), "404 Not Found");
        assert_eq!(status_label(Some(799)), "799");
        assert_eq!(status_label(None), "failed");
    }

    #[test]
    fn test_colors() {
        assert_eq!(status_color(StatusClass::Success), Color::Green);
        assert_eq!(status_color(StatusClass::of(Some(500))), Color::Magenta);
        assert_eq!(method_color("DELETE"), Color::Red);
        assert_eq!(method_color("OPTIONS"), Color::White);
    }

    #[test]
    fn test_plain_output_has_no_escapes() {
        let p = Printer::plain();
        assert_eq!(p.method("GET"), "GET    ");
        assert!(!p.status(Some(201)).contains('\u{1b}'));

        let colored = Printer::new(true);
        assert!(colored.method("GET").contains('\u{1b}'));
    }

    #[test]
    fn test_tree_outline() {
        let mut root = NavigationNode::root();
        let mut ep = Endpoint::new("GET", "/users");
        ep.name = Some("List".into());
        root.branch_mut(&["Users".into()]).push_leaf(ep);
        root.branch_mut(&["Users".into(), "Roles".into()])
            .push_leaf(Endpoint::new("POST", "/roles"));

        let text = Printer::plain().tree(&root);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Users (2)",
                "  GET     /users  List",
                "  Roles (1)",
                "    POST    /roles",
            ]
        );
    }

    #[test]
    fn test_failed_result() {
        let result = ExecutionResult {
            method: HttpMethod::GET,
            url: "http://127.0.0.1:1/".into(),
            final_url: None,
            status: None,
            headers: BTreeMap::new(),
            body: String::new(),
            structured: None,
            elapsed_ms: 3,
            size_bytes: 0,
            error: Some("Connection failed".into()),
        };
        let text = Printer::plain().result(&result, true);
        assert!(text.contains("-> failed"));
        assert!(text.contains("error: Connection failed"));
    }

    #[test]
    fn test_environment_masks_secrets() {
        let env = Environment {
            id: 1,
            name: "dev".into(),
            variables: BTreeMap::from([
                ("api_token".to_string(), "abc".to_string()),
                ("host".to_string(), "localhost".to_string()),
            ]),
            is_active: true,
            ..Default::default()
        };
        let p = Printer::plain();
        let text = p.environment_detail(&env, false);
        assert!(text.starts_with("*   1  dev  (2 variables)"));
        assert!(text.contains("api_token  ********"));
        assert!(text.contains("host       localhost"));
        assert!(p.environment_detail(&env, true).contains("abc"));
    }
}
