//! Command handlers - request execution and history

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::Dashboard;
use crate::curl::to_curl;
use crate::error::{AppResult, ValidationError};
use crate::export::{self, ExportFormat};
use crate::models::{AuthType, Header, HistoryEntry, NewHistoryEntry, RequestSpec};
use crate::network::ExecutionResult;
use crate::storage::HistoryFilter;
use crate::template::{resolve_request, unresolved_in_request};

/// Adjustments applied to a documented endpoint before it is sent
#[derive(Debug, Clone, Default)]
pub struct RequestOverrides {
    /// Added, or replacing a documented header with the same name
    pub headers: Vec<Header>,
    /// Appended to the documented query
    pub query: Vec<(String, String)>,
    /// Replaces the documented body
    pub body: Option<Value>,
    pub auth: Option<AuthType>,
}

impl RequestOverrides {
    pub fn apply(self, request: &mut RequestSpec) {
        for header in self.headers {
            request
                .headers
                .retain(|h| !h.key.eq_ignore_ascii_case(&header.key));
            request.headers.push(header);
        }
        request.query.extend(self.query);
        if let Some(body) = self.body {
            request.body = Some(body);
        }
        if let Some(auth) = self.auth {
            request.auth = auth;
        }
    }
}

/// What would be sent, without sending it
#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    /// Request after substitution
    pub request: RequestSpec,
    pub curl: String,
    /// Tokens left in place for lack of a binding
    pub unresolved: Vec<String>,
    pub environment: Option<String>,
}

/// One completed execution and where it was recorded
#[derive(Debug, Clone, Serialize)]
pub struct Execution {
    pub result: ExecutionResult,
    pub history_id: i64,
    pub curl: String,
    pub unresolved: Vec<String>,
    pub environment: Option<String>,
}

impl Dashboard {
    /// The documented request for `method path`, before substitution
    pub async fn endpoint_request(&self, doc_id: i64, method: &str, path: &str) -> AppResult<RequestSpec> {
        let doc = self.open_documentation(doc_id).await?;
        let endpoint = doc
            .parsed
            .find(method, path)
            .ok_or_else(|| ValidationError::UnknownEndpoint {
                doc_id,
                method: method.trim().to_uppercase(),
                path: path.to_string(),
            })?;
        Ok(endpoint.to_request(&self.config.base_url_variable)?)
    }

    /// Resolves against the active environment without executing
    pub async fn preview(&self, request: &RequestSpec) -> AppResult<Preview> {
        let env = self.active_environment().await?;
        let vars = env.as_ref().map(|e| e.variables.clone()).unwrap_or_default();
        let resolved = resolve_request(request, &vars);
        Ok(Preview {
            curl: to_curl(&resolved),
            unresolved: unresolved_in_request(request, &vars),
            request: resolved,
            environment: env.map(|e| e.name),
        })
    }

    /// Resolves, executes and records one request. Network failures are
    /// part of the returned result and are recorded like any other
    /// execution.
    pub async fn execute(&self, request: &RequestSpec) -> AppResult<Execution> {
        let env = self.active_environment().await?;
        let vars = env.as_ref().map(|e| e.variables.clone()).unwrap_or_default();

        let unresolved = unresolved_in_request(request, &vars);
        if !unresolved.is_empty() {
            warn!(tokens = ?unresolved, "request has unresolved tokens");
        }
        let resolved = resolve_request(request, &vars);

        let executed_at = Utc::now();
        let result = self.executor.execute(&resolved).await;

        let entry = NewHistoryEntry {
            endpoint: result.url.clone(),
            method: resolved.method.as_str().to_string(),
            request_headers: resolved.header_map(),
            request_body: resolved.body_text(),
            response_status: result.status.map(i64::from),
            response_headers: result.headers.clone(),
            response_body: result.body.clone(),
            error: result.error.clone(),
            elapsed_ms: i64::try_from(result.elapsed_ms).unwrap_or(i64::MAX),
            executed_at,
            environment_id: env.as_ref().map(|e| e.id),
        };
        let history_id = self.storage.append_history(&entry).await?;

        info!(
            history_id,
            method = %resolved.method,
            url = %result.url,
            status = ?result.status,
            elapsed_ms = result.elapsed_ms,
            error = ?result.error,
            "executed request"
        );

        Ok(Execution {
            curl: to_curl(&resolved),
            result,
            history_id,
            unresolved,
            environment: env.map(|e| e.name),
        })
    }

    /// Executes a documented endpoint with optional adjustments
    pub async fn run_endpoint(
        &self,
        doc_id: i64,
        method: &str,
        path: &str,
        overrides: RequestOverrides,
    ) -> AppResult<Execution> {
        let mut request = self.endpoint_request(doc_id, method, path).await?;
        overrides.apply(&mut request);
        self.execute(&request).await
    }

    /// Newest first. A filter limit of zero takes the configured default.
    pub async fn list_history(&self, filter: &HistoryFilter) -> AppResult<Vec<HistoryEntry>> {
        let mut filter = filter.clone();
        if filter.limit == 0 {
            filter.limit = self.config.history_limit;
        }
        Ok(self.storage.list_history(&filter).await?)
    }

    pub async fn history_entry(&self, id: i64) -> AppResult<HistoryEntry> {
        self.storage.get_history(id).await?.ok_or_else(|| {
            ValidationError::NotFound {
                entity: "history entry",
                id,
            }
            .into()
        })
    }

    pub async fn export_history(&self, filter: &HistoryFilter, format: ExportFormat) -> AppResult<String> {
        let entries = self.list_history(filter).await?;
        let now = Utc::now();
        let text = match format {
            ExportFormat::Json => export::history::to_json(&entries)?,
            ExportFormat::Postman => serde_json::to_string_pretty(&export::history::to_postman(
                &entries,
                "Request History",
                now,
            ))?,
            ExportFormat::Markdown => export::history::to_markdown(&entries, now),
            ExportFormat::Report => serde_json::to_string_pretty(&export::history::report(&entries, now))?,
        };
        info!(entries = entries.len(), %format, "exported history");
        Ok(text)
    }

    /// Clears everything, or only entries older than `before`
    pub async fn clear_history(&self, before: Option<DateTime<Utc>>) -> AppResult<u64> {
        let removed = match before {
            Some(cutoff) => self.storage.clear_history_before(cutoff).await?,
            None => self.storage.clear_history().await?,
        };
        Ok(removed)
    }
}
