//! Environment management

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::info;

use super::Dashboard;
use crate::error::{AppResult, ValidationError};
use crate::export::{self, ExportFormat};
use crate::models::{parse_pair, Environment, NewEnvironment};

impl Dashboard {
    /// Creates an environment, or replaces the one with the same name
    pub async fn create_environment(&self, input: NewEnvironment) -> AppResult<Environment> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let input = NewEnvironment {
            name: name.to_string(),
            ..input
        };
        Ok(self.storage.save_environment(&input).await?)
    }

    /// Resolves an environment by name, falling back to a numeric id
    pub async fn environment(&self, reference: &str) -> AppResult<Environment> {
        if let Some(env) = self.storage.find_environment_by_name(reference).await? {
            return Ok(env);
        }
        let Ok(id) = reference.trim().parse::<i64>() else {
            return Err(ValidationError::UnknownName {
                entity: "environment",
                name: reference.to_string(),
            }
            .into());
        };
        self.storage
            .get_environment(id)
            .await?
            .ok_or_else(|| {
                ValidationError::NotFound {
                    entity: "environment",
                    id,
                }
                .into()
            })
    }

    pub async fn list_environments(&self) -> AppResult<Vec<Environment>> {
        Ok(self.storage.list_environments().await?)
    }

    pub async fn active_environment(&self) -> AppResult<Option<Environment>> {
        Ok(self.storage.get_active_environment().await?)
    }

    /// Applies `key=value` assignments; an empty value after `=` is kept
    pub async fn set_variables(&self, reference: &str, assignments: &[String]) -> AppResult<Environment> {
        let pairs = assignments
            .iter()
            .map(|a| parse_pair(a))
            .collect::<Result<Vec<_>, _>>()?;

        let env = self.environment(reference).await?;
        let mut variables = env.variables;
        variables.extend(pairs);
        let updated = self.storage.update_variables(env.id, &variables).await?;
        info!(id = updated.id, count = assignments.len(), "set variables");
        Ok(updated)
    }

    /// Removes variables; unknown keys are ignored
    pub async fn unset_variables(&self, reference: &str, keys: &[String]) -> AppResult<Environment> {
        let env = self.environment(reference).await?;
        let variables: BTreeMap<String, String> = env
            .variables
            .into_iter()
            .filter(|(k, _)| !keys.contains(k))
            .collect();
        Ok(self.storage.update_variables(env.id, &variables).await?)
    }

    /// Makes the environment the only active one
    pub async fn activate_environment(&self, reference: &str) -> AppResult<Environment> {
        let env = self.environment(reference).await?;
        self.storage.set_active(env.id).await?;
        info!(id = env.id, name = %env.name, "environment activated");
        Ok(Environment {
            is_active: true,
            ..env
        })
    }

    /// Leaves no environment active
    pub async fn deactivate_environments(&self) -> AppResult<u64> {
        let count = self.storage.deactivate_all().await?;
        info!(count, "environments deactivated");
        Ok(count)
    }

    pub async fn delete_environment(&self, reference: &str) -> AppResult<Environment> {
        let env = self.environment(reference).await?;
        self.storage.delete_environment(env.id).await?;
        info!(id = env.id, name = %env.name, "deleted environment");
        Ok(env)
    }

    /// Imports a native, Postman or flat JSON environment file. `name`
    /// overrides the name found in the file.
    pub async fn import_environment(
        &self,
        text: &str,
        name: Option<&str>,
        activate: bool,
    ) -> AppResult<Environment> {
        let imported = export::import_environment(text)?;
        let format = imported.format;
        let mut input = imported.into_new(name);
        input.is_active = activate;
        let env = self.create_environment(input).await?;
        info!(id = env.id, name = %env.name, ?format, variables = env.variables.len(), "imported environment");
        Ok(env)
    }

    /// Renders one environment (the active one when `reference` is
    /// `None`), or a report over all of them
    pub async fn export_environment(&self, reference: Option<&str>, format: ExportFormat) -> AppResult<String> {
        let now = Utc::now();
        let text = match format {
            ExportFormat::Report => {
                let envs = self.list_environments().await?;
                serde_json::to_string_pretty(&export::environment::report(&envs, now))?
            }
            ExportFormat::Json => export::environment::to_json(&self.export_target(reference).await?, now)?,
            ExportFormat::Postman => {
                let env = self.export_target(reference).await?;
                serde_json::to_string_pretty(&export::environment::to_postman(&env, now))?
            }
            ExportFormat::Markdown => {
                export::environment::to_markdown(&self.export_target(reference).await?, now)
            }
        };
        Ok(text)
    }

    async fn export_target(&self, reference: Option<&str>) -> AppResult<Environment> {
        match reference {
            Some(reference) => self.environment(reference).await,
            None => self
                .active_environment()
                .await?
                .ok_or_else(|| ValidationError::NoActiveEnvironment.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::app::Dashboard;
    use crate::config::Config;
    use crate::error::{AppError, ValidationError};
    use crate::export::ExportFormat;
    use crate::models::NewEnvironment;

    async fn dashboard() -> Dashboard {
        Dashboard::in_memory(Config::default()).await.unwrap()
    }

    #[tokio::test]
    async fn test_activation_leaves_exactly_one_active() {
        let d = dashboard().await;
        d.create_environment(NewEnvironment::new("a")).await.unwrap();
        d.create_environment(NewEnvironment::new("b")).await.unwrap();

        d.activate_environment("a").await.unwrap();
        d.activate_environment("b").await.unwrap();

        let active: Vec<_> = d
            .list_environments()
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.is_active)
            .map(|e| e.name)
            .collect();
        assert_eq!(active, vec!["b".to_string()]);
        assert_eq!(d.active_environment().await.unwrap().unwrap().name, "b");
    }

    #[tokio::test]
    async fn test_activate_unknown_is_validation_error() {
        let d = dashboard().await;
        assert!(matches!(
            d.activate_environment("ghost").await.unwrap_err(),
            AppError::Validation(ValidationError::UnknownName { .. })
        ));
        assert!(matches!(
            d.activate_environment("41").await.unwrap_err(),
            AppError::Validation(ValidationError::NotFound { id: 41, .. })
        ));
    }

    #[tokio::test]
    async fn test_set_and_unset_variables() {
        let d = dashboard().await;
        d.create_environment(NewEnvironment::new("dev").with_var("keep", "1"))
            .await
            .unwrap();

        let env = d
            .set_variables("dev", &["host=localhost".into(), "empty=".into()])
            .await
            .unwrap();
        assert_eq!(env.variables.len(), 3);
        assert_eq!(env.variables["empty"], "");

        let env = d.unset_variables("dev", &["keep".into()]).await.unwrap();
        assert!(!env.variables.contains_key("keep"));

        assert!(d.set_variables("dev", &["novalue".into()]).await.is_err());
    }

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let d = dashboard().await;
        d.create_environment(NewEnvironment {
            name: "staging".into(),
            description: "Shared".into(),
            ..NewEnvironment::new("staging").with_var("base_url", "https://s.example.com")
        })
        .await
        .unwrap();

        let exported = d
            .export_environment(Some("staging"), ExportFormat::Json)
            .await
            .unwrap();
        d.delete_environment("staging").await.unwrap();

        let env = d.import_environment(&exported, None, true).await.unwrap();
        assert_eq!(env.name, "staging");
        assert_eq!(env.description, "Shared");
        assert_eq!(env.variables["base_url"], "https://s.example.com");
        assert!(env.is_active);
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let d = dashboard().await;
        assert!(matches!(
            d.create_environment(NewEnvironment::new(" ")).await.unwrap_err(),
            AppError::Validation(ValidationError::EmptyName)
        ));
    }
}
