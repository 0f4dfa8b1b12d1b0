//! Documentation upload, browsing and export

use std::path::Path;

use chrono::Utc;
use serde_json::Value;
use tracing::info;

use super::Dashboard;
use crate::error::{AppResult, ParseError, ValidationError};
use crate::export::{self, ExportFormat};
use crate::models::Documentation;
use crate::parser::{self, Endpoint, ParsedDocument};

/// A stored document together with its parse
#[derive(Debug, Clone)]
pub struct OpenDocument {
    pub documentation: Documentation,
    pub parsed: ParsedDocument,
}

/// Result of an upload; the document is stored even when the parse produced
/// only warnings
pub type UploadOutcome = OpenDocument;

impl Dashboard {
    /// Parses `text` and stores it under `name`, replacing the content of a
    /// document with the same name. Malformed JSON is rejected before
    /// anything is stored.
    pub async fn upload_documentation(
        &self,
        name: &str,
        text: &str,
        source_identifier: Option<&str>,
    ) -> AppResult<UploadOutcome> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }

        let content: Value = serde_json::from_str(text).map_err(ParseError::from)?;
        let parsed = parser::parse_value(&content);

        let id = self
            .storage
            .save_documentation(name, source_identifier, &content)
            .await?;
        let documentation = self.documentation(id).await?;
        info!(
            id,
            name,
            endpoints = parsed.endpoints.len(),
            categories = parsed.stats().categories,
            "uploaded documentation"
        );
        Ok(OpenDocument {
            documentation,
            parsed,
        })
    }

    /// Reads a file and uploads it; the name defaults to the file stem
    pub async fn import_documentation_file(
        &self,
        path: &Path,
        name: Option<&str>,
    ) -> AppResult<UploadOutcome> {
        let text = tokio::fs::read_to_string(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = name.map(str::to_string).unwrap_or(stem);
        self.upload_documentation(&name, &text, file_name.as_deref())
            .await
    }

    /// Full replacement of an existing document
    pub async fn replace_documentation(&self, id: i64, text: &str) -> AppResult<OpenDocument> {
        let content: Value = serde_json::from_str(text).map_err(ParseError::from)?;
        self.storage.replace_documentation(id, &content).await?;
        self.open_documentation(id).await
    }

    async fn documentation(&self, id: i64) -> AppResult<Documentation> {
        self.storage
            .get_documentation(id)
            .await?
            .ok_or_else(|| {
                ValidationError::NotFound {
                    entity: "documentation",
                    id,
                }
                .into()
            })
    }

    /// Loads and parses a stored document
    pub async fn open_documentation(&self, id: i64) -> AppResult<OpenDocument> {
        let documentation = self.documentation(id).await?;
        let parsed = parser::parse_value(&documentation.content);
        Ok(OpenDocument {
            documentation,
            parsed,
        })
    }

    /// Resolves a document by name, falling back to a numeric id
    pub async fn find_documentation(&self, reference: &str) -> AppResult<Documentation> {
        if let Some(doc) = self.storage.find_documentation_by_name(reference).await? {
            return Ok(doc);
        }
        match reference.trim().parse::<i64>() {
            Ok(id) => self.documentation(id).await,
            Err(_) => Err(ValidationError::UnknownName {
                entity: "documentation",
                name: reference.to_string(),
            }
            .into()),
        }
    }

    pub async fn list_documentation(&self) -> AppResult<Vec<Documentation>> {
        Ok(self.storage.list_documentation().await?)
    }

    pub async fn delete_documentation(&self, id: i64) -> AppResult<()> {
        if !self.storage.delete_documentation(id).await? {
            return Err(ValidationError::NotFound {
                entity: "documentation",
                id,
            }
            .into());
        }
        info!(id, "deleted documentation");
        Ok(())
    }

    /// Endpoints of one document matching `query`
    pub async fn search_documentation(&self, id: i64, query: &str) -> AppResult<Vec<Endpoint>> {
        let doc = self.open_documentation(id).await?;
        Ok(doc.parsed.search(query).into_iter().cloned().collect())
    }

    /// Renders a document in `format`
    pub async fn export_documentation(&self, id: i64, format: ExportFormat) -> AppResult<String> {
        let OpenDocument {
            documentation,
            parsed,
        } = self.open_documentation(id).await?;
        let now = Utc::now();

        let text = match format {
            ExportFormat::Json => export::documentation::to_json(&documentation)?,
            ExportFormat::Postman => serde_json::to_string_pretty(&export::documentation::to_postman(
                &documentation,
                &parsed,
                &self.config.base_url_variable,
                now,
            ))?,
            ExportFormat::Markdown => export::documentation::to_markdown(&documentation, &parsed, now),
            ExportFormat::Report => serde_json::to_string_pretty(&export::documentation::report(
                &documentation,
                &parsed,
                now,
            ))?,
        };
        info!(id, %format, "exported documentation");
        Ok(text)
    }
}
