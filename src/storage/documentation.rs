//! Queries for the `documentation` table

use chrono::Utc;
use serde_json::Value;
use sqlx::types::Json;
use tracing::info;

use super::{Storage, StoreResult};
use crate::error::StoreError;
use crate::models::Documentation;

/// Column list for `documentation` queries.
const DOC_COLUMNS: &str = "id, name, source_identifier, content, uploaded_at, last_modified";

impl Storage {
    /// Inserts a document, or replaces the content of the one with the same
    /// name. Returns its id.
    pub async fn save_documentation(
        &self,
        name: &str,
        source_identifier: Option<&str>,
        content: &Value,
    ) -> StoreResult<i64> {
        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO documentation (name, source_identifier, content, uploaded_at, last_modified) \
             VALUES (?1, ?2, ?3, ?4, ?4) \
             ON CONFLICT (name) DO UPDATE SET \
                 content = excluded.content, \
                 source_identifier = COALESCE(excluded.source_identifier, documentation.source_identifier), \
                 last_modified = excluded.last_modified \
             RETURNING id",
        )
        .bind(name)
        .bind(source_identifier)
        .bind(Json(content))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        info!(id, name, "saved documentation");
        Ok(id)
    }

    /// Full replacement of an existing document's content
    pub async fn replace_documentation(&self, id: i64, content: &Value) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE documentation SET content = ?2, last_modified = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(Json(content))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "documentation",
                id,
            });
        }
        Ok(())
    }

    pub async fn get_documentation(&self, id: i64) -> StoreResult<Option<Documentation>> {
        let query = format!("SELECT {DOC_COLUMNS} FROM documentation WHERE id = ?1");
        let doc = sqlx::query_as::<_, Documentation>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc)
    }

    pub async fn find_documentation_by_name(&self, name: &str) -> StoreResult<Option<Documentation>> {
        let query = format!("SELECT {DOC_COLUMNS} FROM documentation WHERE name = ?1");
        let doc = sqlx::query_as::<_, Documentation>(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc)
    }

    /// Most recently modified first
    pub async fn list_documentation(&self) -> StoreResult<Vec<Documentation>> {
        let query = format!(
            "SELECT {DOC_COLUMNS} FROM documentation ORDER BY last_modified DESC, id DESC"
        );
        let docs = sqlx::query_as::<_, Documentation>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(docs)
    }

    /// Returns whether a row was deleted
    pub async fn delete_documentation(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM documentation WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
