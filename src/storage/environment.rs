//! Queries for the `environments` table
//!
//! Activation always runs in one transaction: deactivate the others, then
//! activate the target. The partial unique index rejects any interleaving
//! that would leave two active rows.

use std::collections::BTreeMap;

use chrono::Utc;
use sqlx::types::Json;
use tracing::info;

use super::{Storage, StoreResult};
use crate::error::StoreError;
use crate::models::{Environment, NewEnvironment};

/// Column list for `environments` queries.
const ENV_COLUMNS: &str = "id, name, description, variables, created_at, updated_at, is_active";

impl Storage {
    /// Inserts or replaces (by name) an environment. When `is_active` is set
    /// every other environment is deactivated in the same transaction.
    pub async fn save_environment(&self, input: &NewEnvironment) -> StoreResult<Environment> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        if input.is_active {
            sqlx::query("UPDATE environments SET is_active = 0 WHERE is_active = 1 AND name <> ?1")
                .bind(&input.name)
                .execute(&mut *tx)
                .await?;
        }

        let query = format!(
            "INSERT INTO environments (name, description, variables, is_active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5) \
             ON CONFLICT (name) DO UPDATE SET \
                 description = excluded.description, \
                 variables = excluded.variables, \
                 is_active = excluded.is_active, \
                 updated_at = excluded.updated_at \
             RETURNING {ENV_COLUMNS}"
        );
        let env = sqlx::query_as::<_, Environment>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(Json(&input.variables))
            .bind(input.is_active)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(id = env.id, name = %env.name, active = env.is_active, "saved environment");
        Ok(env)
    }

    pub async fn get_environment(&self, id: i64) -> StoreResult<Option<Environment>> {
        let query = format!("SELECT {ENV_COLUMNS} FROM environments WHERE id = ?1");
        let env = sqlx::query_as::<_, Environment>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(env)
    }

    pub async fn find_environment_by_name(&self, name: &str) -> StoreResult<Option<Environment>> {
        let query = format!("SELECT {ENV_COLUMNS} FROM environments WHERE name = ?1");
        let env = sqlx::query_as::<_, Environment>(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(env)
    }

    /// Alphabetical by name
    pub async fn list_environments(&self) -> StoreResult<Vec<Environment>> {
        let query = format!("SELECT {ENV_COLUMNS} FROM environments ORDER BY name, id");
        let envs = sqlx::query_as::<_, Environment>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(envs)
    }

    pub async fn get_active_environment(&self) -> StoreResult<Option<Environment>> {
        let query = format!("SELECT {ENV_COLUMNS} FROM environments WHERE is_active = 1 LIMIT 1");
        let env = sqlx::query_as::<_, Environment>(&query)
            .fetch_optional(&self.pool)
            .await?;
        Ok(env)
    }

    /// Makes `id` the only active environment.
    pub async fn set_active(&self, id: i64) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        // Write first so the transaction takes the write lock up front
        sqlx::query("UPDATE environments SET is_active = 0 WHERE is_active = 1 AND id <> ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("UPDATE environments SET is_active = 1 WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::NotFound {
                entity: "environment",
                id,
            });
        }

        tx.commit().await?;
        info!(id, "activated environment");
        Ok(())
    }

    /// Leaves no environment active. Returns how many were deactivated.
    pub async fn deactivate_all(&self) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE environments SET is_active = 0 WHERE is_active = 1")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Replaces the variable mapping
    pub async fn update_variables(
        &self,
        id: i64,
        variables: &BTreeMap<String, String>,
    ) -> StoreResult<Environment> {
        let query = format!(
            "UPDATE environments SET variables = ?2, updated_at = ?3 WHERE id = ?1 \
             RETURNING {ENV_COLUMNS}"
        );
        sqlx::query_as::<_, Environment>(&query)
            .bind(id)
            .bind(Json(variables))
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "environment",
                id,
            })
    }

    /// History rows keep their entries with a null environment reference
    pub async fn delete_environment(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM environments WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn active_count(storage: &Storage) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM environments WHERE is_active = 1")
            .fetch_one(storage.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_save_and_lookup() {
        let storage = Storage::open_in_memory().await.unwrap();
        let env = storage
            .save_environment(
                &NewEnvironment::new("dev")
                    .with_var("base_url", "http://localhost:8000")
                    .with_var("token", "abc"),
            )
            .await
            .unwrap();

        assert!(!env.is_active);
        assert_eq!(env.get("token").map(String::as_str), Some("abc"));

        let by_name = storage.find_environment_by_name("dev").await.unwrap().unwrap();
        assert_eq!(by_name.id, env.id);
        assert_eq!(by_name.variables, env.variables);
        assert!(storage.get_active_environment().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_variables() {
        let storage = Storage::open_in_memory().await.unwrap();
        let first = storage
            .save_environment(&NewEnvironment::new("dev").with_var("a", "1"))
            .await
            .unwrap();
        let mut input = NewEnvironment::new("dev").with_var("b", "2");
        input.description = "local".into();
        let second = storage.save_environment(&input).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.description, "local");
        assert!(second.get("a").is_none());
        assert_eq!(storage.list_environments().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_saving_active_deactivates_others() {
        let storage = Storage::open_in_memory().await.unwrap();
        let mut a = NewEnvironment::new("a");
        a.is_active = true;
        storage.save_environment(&a).await.unwrap();
        let mut b = NewEnvironment::new("b");
        b.is_active = true;
        let b = storage.save_environment(&b).await.unwrap();

        assert_eq!(active_count(&storage).await, 1);
        assert_eq!(storage.get_active_environment().await.unwrap().unwrap().id, b.id);
    }

    #[tokio::test]
    async fn test_set_active_unknown_id_keeps_current() {
        let storage = Storage::open_in_memory().await.unwrap();
        let a = storage.save_environment(&NewEnvironment::new("a")).await.unwrap();
        storage.set_active(a.id).await.unwrap();

        let err = storage.set_active(4242).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 4242, .. }));
        // Rolled back: A is still the active one
        assert_eq!(storage.get_active_environment().await.unwrap().unwrap().id, a.id);
    }

    #[tokio::test]
    async fn test_deactivate_all_and_update_variables() {
        let storage = Storage::open_in_memory().await.unwrap();
        let a = storage.save_environment(&NewEnvironment::new("a")).await.unwrap();
        storage.set_active(a.id).await.unwrap();
        assert_eq!(storage.deactivate_all().await.unwrap(), 1);
        assert_eq!(active_count(&storage).await, 0);

        let vars: BTreeMap<String, String> = [("k".to_string(), "v".to_string())].into();
        let updated = storage.update_variables(a.id, &vars).await.unwrap();
        assert_eq!(updated.variables, vars);
        assert!(updated.updated_at >= a.updated_at);
        assert!(storage.update_variables(99, &vars).await.is_err());

        assert!(storage.delete_environment(a.id).await.unwrap());
        assert!(storage.get_environment(a.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_partial_index_rejects_second_active_row() {
        let storage = Storage::open_in_memory().await.unwrap();
        let a = storage.save_environment(&NewEnvironment::new("a")).await.unwrap();
        let b = storage.save_environment(&NewEnvironment::new("b")).await.unwrap();
        storage.set_active(a.id).await.unwrap();

        let raw = sqlx::query("UPDATE environments SET is_active = 1 WHERE id = ?1")
            .bind(b.id)
            .execute(storage.pool())
            .await;
        assert!(raw.is_err());
        assert_eq!(active_count(&storage).await, 1);
    }
}
