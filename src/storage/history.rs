//! Queries for the append-only `history` table

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use tracing::{debug, info};

use super::{Storage, StoreResult};
use crate::constants::DEFAULT_HISTORY_LIMIT;
use crate::models::{HistoryEntry, NewHistoryEntry, StatusClass};

/// Column list for `history` queries.
const HISTORY_COLUMNS: &str = "id, endpoint, method, request_headers, request_body, \
                               response_status, response_headers, response_body, error, \
                               elapsed_ms, executed_at, environment_id";

/// Filters for [`Storage::list_history`]. Unset fields match everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryFilter {
    /// Exact method, case-insensitive
    pub method: Option<String>,
    /// Substring of the resolved endpoint URL
    pub endpoint_contains: Option<String>,
    pub status_class: Option<StatusClass>,
    pub environment_id: Option<i64>,
    pub failed_only: bool,
    pub limit: i64,
}

impl Default for HistoryFilter {
    fn default() -> Self {
        HistoryFilter {
            method: None,
            endpoint_contains: None,
            status_class: None,
            environment_id: None,
            failed_only: false,
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl HistoryFilter {
    pub fn with_limit(limit: i64) -> Self {
        HistoryFilter {
            limit,
            ..Default::default()
        }
    }
}

/// Typed bind value for the dynamically-built history query.
enum BindValue {
    BigInt(i64),
    Text(String),
}

/// Build a WHERE clause and bind values from a [`HistoryFilter`].
///
/// Returns `(where_clause, bind_values, next_bind_index)`.
fn build_history_filter(filter: &HistoryFilter) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_idx = 1u32;
    let mut bind_values: Vec<BindValue> = Vec::new();

    if let Some(ref method) = filter.method {
        conditions.push(format!("method = ?{bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(method.trim().to_uppercase()));
    }

    if let Some(ref needle) = filter.endpoint_contains {
        conditions.push(format!("instr(endpoint, ?{bind_idx}) > 0"));
        bind_idx += 1;
        bind_values.push(BindValue::Text(needle.clone()));
    }

    match filter.status_class.and_then(|c| c.range()) {
        Some((low, high)) => {
            conditions.push(format!(
                "response_status BETWEEN ?{bind_idx} AND ?{}",
                bind_idx + 1
            ));
            bind_idx += 2;
            bind_values.push(BindValue::BigInt(low));
            bind_values.push(BindValue::BigInt(high));
        }
        None if filter.status_class == Some(StatusClass::Failed) => {
            conditions.push("response_status IS NULL".to_string());
        }
        None => {}
    }

    if filter.failed_only {
        conditions.push("response_status IS NULL".to_string());
    }

    if let Some(environment_id) = filter.environment_id {
        conditions.push(format!("environment_id = ?{bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(environment_id));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, bind_values, bind_idx)
}

impl Storage {
    /// Records one execution. Entries are never updated afterwards.
    pub async fn append_history(&self, entry: &NewHistoryEntry) -> StoreResult<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO history (endpoint, method, request_headers, request_body, \
                 response_status, response_headers, response_body, error, \
                 elapsed_ms, executed_at, environment_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
             RETURNING id",
        )
        .bind(&entry.endpoint)
        .bind(&entry.method)
        .bind(Json(&entry.request_headers))
        .bind(&entry.request_body)
        .bind(entry.response_status)
        .bind(Json(&entry.response_headers))
        .bind(&entry.response_body)
        .bind(&entry.error)
        .bind(entry.elapsed_ms)
        .bind(entry.executed_at)
        .bind(entry.environment_id)
        .fetch_one(&self.pool)
        .await?;

        debug!(id, method = %entry.method, endpoint = %entry.endpoint, "appended history");
        Ok(id)
    }

    /// Newest first
    pub async fn list_history(&self, filter: &HistoryFilter) -> StoreResult<Vec<HistoryEntry>> {
        let (where_clause, bind_values, bind_idx) = build_history_filter(filter);
        let query = format!(
            "SELECT {HISTORY_COLUMNS} FROM history {where_clause} \
             ORDER BY executed_at DESC, id DESC \
             LIMIT ?{bind_idx}"
        );

        let mut q = sqlx::query_as::<_, HistoryEntry>(&query);
        for value in bind_values {
            q = match value {
                BindValue::BigInt(v) => q.bind(v),
                BindValue::Text(v) => q.bind(v),
            };
        }
        // A non-positive limit means no limit
        let limit = if filter.limit > 0 { filter.limit } else { -1 };
        q = q.bind(limit);

        let entries = q.fetch_all(&self.pool).await?;
        Ok(entries)
    }

    pub async fn get_history(&self, id: i64) -> StoreResult<Option<HistoryEntry>> {
        let query = format!("SELECT {HISTORY_COLUMNS} FROM history WHERE id = ?1");
        let entry = sqlx::query_as::<_, HistoryEntry>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    /// Deletes every entry. Returns how many were removed.
    pub async fn clear_history(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM history")
            .execute(&self.pool)
            .await?;
        info!(removed = result.rows_affected(), "cleared history");
        Ok(result.rows_affected())
    }

    /// Deletes entries executed strictly before `cutoff`
    pub async fn clear_history_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM history WHERE executed_at < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        info!(removed = result.rows_affected(), %cutoff, "cleared old history");
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewEnvironment;
    use chrono::Duration;
    use std::collections::BTreeMap;

    fn entry(method: &str, endpoint: &str, status: Option<i64>) -> NewHistoryEntry {
        NewHistoryEntry {
            endpoint: endpoint.to_string(),
            method: method.to_string(),
            request_headers: BTreeMap::from([("Accept".to_string(), "*/*".to_string())]),
            request_body: String::new(),
            response_status: status,
            response_headers: BTreeMap::new(),
            response_body: String::new(),
            error: status.is_none().then(|| "Connection failed".to_string()),
            elapsed_ms: 12,
            executed_at: Utc::now(),
            environment_id: None,
        }
    }

    #[tokio::test]
    async fn test_append_and_list_newest_first() {
        let storage = Storage::open_in_memory().await.unwrap();
        let mut older = entry("GET", "http://a/1", Some(200));
        older.executed_at = Utc::now() - Duration::minutes(5);
        let first = storage.append_history(&older).await.unwrap();
        let second = storage
            .append_history(&entry("POST", "http://a/2", Some(201)))
            .await
            .unwrap();

        let all = storage.list_history(&HistoryFilter::default()).await.unwrap();
        let ids: Vec<_> = all.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![second, first]);
        assert_eq!(all[1].request_headers["Accept"], "*/*");

        let one = storage.list_history(&HistoryFilter::with_limit(1)).await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].id, second);
    }

    #[tokio::test]
    async fn test_filters() {
        let storage = Storage::open_in_memory().await.unwrap();
        let env = storage
            .save_environment(&NewEnvironment::new("dev"))
            .await
            .unwrap();

        let mut with_env = entry("GET", "http://api/users", Some(200));
        with_env.environment_id = Some(env.id);
        storage.append_history(&with_env).await.unwrap();
        storage.append_history(&entry("GET", "http://api/orders", Some(404))).await.unwrap();
        storage.append_history(&entry("DELETE", "http://api/users/1", None)).await.unwrap();

        let by_method = HistoryFilter {
            method: Some("get".into()),
            ..Default::default()
        };
        assert_eq!(storage.list_history(&by_method).await.unwrap().len(), 2);

        let by_endpoint = HistoryFilter {
            endpoint_contains: Some("users".into()),
            ..Default::default()
        };
        assert_eq!(storage.list_history(&by_endpoint).await.unwrap().len(), 2);

        let client_errors = HistoryFilter {
            status_class: Some(StatusClass::ClientError),
            ..Default::default()
        };
        let found = storage.list_history(&client_errors).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].response_status, Some(404));

        let failed = HistoryFilter {
            failed_only: true,
            ..Default::default()
        };
        let found = storage.list_history(&failed).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].is_failure());
        assert_eq!(found[0].error.as_deref(), Some("Connection failed"));

        let by_env = HistoryFilter {
            environment_id: Some(env.id),
            method: Some("GET".into()),
            ..Default::default()
        };
        assert_eq!(storage.list_history(&by_env).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deleting_environment_nulls_reference() {
        let storage = Storage::open_in_memory().await.unwrap();
        let env = storage
            .save_environment(&NewEnvironment::new("tmp"))
            .await
            .unwrap();
        let mut e = entry("GET", "http://x", Some(200));
        e.environment_id = Some(env.id);
        let id = storage.append_history(&e).await.unwrap();

        storage.delete_environment(env.id).await.unwrap();
        let kept = storage.get_history(id).await.unwrap().unwrap();
        assert_eq!(kept.environment_id, None);
    }

    #[tokio::test]
    async fn test_clear_history() {
        let storage = Storage::open_in_memory().await.unwrap();
        let mut old = entry("GET", "http://x/old", Some(200));
        old.executed_at = Utc::now() - Duration::days(10);
        storage.append_history(&old).await.unwrap();
        storage.append_history(&entry("GET", "http://x/new", Some(200))).await.unwrap();

        let removed = storage
            .clear_history_before(Utc::now() - Duration::days(1))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        let left = storage.list_history(&HistoryFilter::default()).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].endpoint, "http://x/new");

        assert_eq!(storage.clear_history().await.unwrap(), 1);
        assert!(storage.list_history(&HistoryFilter::default()).await.unwrap().is_empty());
    }
}
