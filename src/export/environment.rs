//! Environment import (native, Postman, flat JSON) and export

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{cell, is_secret};
use crate::constants::APP_NAME;
use crate::error::ValidationError;
use crate::models::{Environment, NewEnvironment};
use crate::parser::models::scalar_text;

const HIDDEN: &str = "***HIDDEN***";

/// Which layout an imported file had
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportFormat {
    Native,
    Postman,
    Flat,
}

/// Result of reading an environment file
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedEnvironment {
    pub format: ImportFormat,
    pub name: Option<String>,
    pub description: Option<String>,
    pub variables: BTreeMap<String, String>,
}

impl ImportedEnvironment {
    /// Input for storage; `name` wins over the file's own name
    pub fn into_new(self, name: Option<&str>) -> NewEnvironment {
        NewEnvironment {
            name: name
                .map(str::to_string)
                .or(self.name)
                .unwrap_or_else(|| "Imported Environment".to_string()),
            description: self
                .description
                .unwrap_or_else(|| "Imported from uploaded file".to_string()),
            variables: self.variables,
            is_active: false,
        }
    }
}

/// Native export layout
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NativeExport {
    metadata: NativeMetadata,
    variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NativeMetadata {
    environment_name: String,
    description: String,
    export_timestamp: String,
    source: String,
}

/// Reads any supported environment file
pub fn import_environment(text: &str) -> Result<ImportedEnvironment, ValidationError> {
    let doc: Value = serde_json::from_str(text)
        .map_err(|e| ValidationError::InvalidImport(e.to_string()))?;
    let obj = doc
        .as_object()
        .ok_or_else(|| ValidationError::InvalidImport("expected a JSON object".into()))?;

    if obj.get("_postman_variable_scope").and_then(Value::as_str) == Some("environment") {
        return import_postman(obj);
    }

    if let Some(vars) = obj.get("variables") {
        let vars = vars.as_object().ok_or_else(|| {
            ValidationError::InvalidImport("'variables' must be an object".into())
        })?;
        let metadata = obj.get("metadata");
        let text_field = |top: &str, nested: &str| {
            obj.get(top)
                .or_else(|| metadata.and_then(|m| m.get(nested)))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        return Ok(ImportedEnvironment {
            format: ImportFormat::Native,
            name: text_field("name", "environment_name"),
            description: text_field("description", "description"),
            variables: scalar_members(vars),
        });
    }

    Ok(ImportedEnvironment {
        format: ImportFormat::Flat,
        name: None,
        description: None,
        variables: scalar_members(obj),
    })
}

fn import_postman(obj: &Map<String, Value>) -> Result<ImportedEnvironment, ValidationError> {
    let values = match obj.get("values") {
        None => &[][..],
        Some(Value::Array(items)) => items.as_slice(),
        Some(_) => {
            return Err(ValidationError::InvalidImport(
                "Postman 'values' must be a list".into(),
            ))
        }
    };

    let variables = values
        .iter()
        .filter(|v| v.get("enabled").and_then(Value::as_bool).unwrap_or(true))
        .filter_map(|v| {
            let key = v.get("key")?.as_str()?;
            let value = v.get("value").map(scalar_text).unwrap_or_default();
            Some((key.to_string(), value))
        })
        .collect();

    Ok(ImportedEnvironment {
        format: ImportFormat::Postman,
        name: obj.get("name").and_then(Value::as_str).map(str::to_string),
        description: None,
        variables,
    })
}

/// Scalars become strings; nested objects and arrays are not variables
fn scalar_members(map: &Map<String, Value>) -> BTreeMap<String, String> {
    map.iter()
        .filter(|(_, v)| !v.is_object() && !v.is_array())
        .map(|(k, v)| (k.clone(), scalar_text(v)))
        .collect()
}

/// Native JSON; re-importable through [`import_environment`]
pub fn to_json(env: &Environment, now: DateTime<Utc>) -> Result<String, serde_json::Error> {
    let export = NativeExport {
        metadata: NativeMetadata {
            environment_name: env.name.clone(),
            description: env.description.clone(),
            export_timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            source: APP_NAME.to_string(),
        },
        variables: env.variables.clone(),
    };
    serde_json::to_string_pretty(&export)
}

/// Postman environment; credential-looking keys are typed `secret`
pub fn to_postman(env: &Environment, now: DateTime<Utc>) -> Value {
    let values: Vec<Value> = env
        .variables
        .iter()
        .map(|(key, value)| {
            let kind = if is_secret(key) { "secret" } else { "default" };
            json!({
                "key": key,
                "value": value,
                "type": kind,
                "enabled": true,
            })
        })
        .collect();

    json!({
        "id": uuid::Uuid::new_v4().to_string(),
        "name": env.name,
        "values": values,
        "_postman_variable_scope": "environment",
        "_postman_exported_at": now.to_rfc3339_opts(SecondsFormat::Millis, true),
        "_postman_exported_using": APP_NAME,
    })
}

/// Markdown table with secret values masked
pub fn to_markdown(env: &Environment, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Environment Variables: {}\n", env.name);
    let _ = writeln!(out, "Generated on: {}\n", now.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "## Description");
    if env.description.is_empty() {
        let _ = writeln!(out, "No description available\n");
    } else {
        let _ = writeln!(out, "{}\n", env.description);
    }

    let _ = writeln!(out, "## Variables\n");
    let _ = writeln!(out, "| Variable | Value | Type |");
    let _ = writeln!(out, "|----------|-------|------|");
    for (key, value) in &env.variables {
        let (shown, kind) = if is_secret(key) {
            (HIDDEN, "Secret")
        } else {
            (value.as_str(), "Default")
        };
        let _ = writeln!(out, "| {} | {} | {} |", cell(key), cell(shown), kind);
    }

    let _ = writeln!(out, "\n## Summary");
    let _ = writeln!(out, "- Total Variables: {}", env.variables.len());
    let _ = writeln!(out, "- Active: {}", if env.is_active { "yes" } else { "no" });
    out
}

/// Summary of all environments
pub fn report(envs: &[Environment], now: DateTime<Utc>) -> Value {
    let active = envs.iter().find(|e| e.is_active).map(|e| e.name.clone());
    let environments: Vec<Value> = envs
        .iter()
        .map(|env| {
            let names: Vec<&String> = env.variables.keys().collect();
            json!({
                "name": env.name,
                "description": env.description,
                "is_active": env.is_active,
                "variable_count": env.variables.len(),
                "created_at": env.created_at,
                "updated_at": env.updated_at,
                "variables": names,
            })
        })
        .collect();

    json!({
        "summary": {
            "total_environments": envs.len(),
            "export_date": now.to_rfc3339_opts(SecondsFormat::Secs, true),
            "active_environment": active,
        },
        "environments": environments,
    })
}
