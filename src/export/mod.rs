//! Import/export projections of stored records
//!
//! Every export is a pure function of the records passed in (plus the
//! timestamp to stamp on it), so the output is reproducible in tests.

pub mod documentation;
pub mod environment;
pub mod history;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::constants::SECRET_MARKERS;
use crate::error::ValidationError;

pub use environment::{import_environment, ImportFormat, ImportedEnvironment};

/// Output formats shared by all exports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Raw JSON dump
    Json,
    /// Postman collection v2.1 or Postman environment
    Postman,
    /// Human-readable Markdown
    Markdown,
    /// JSON summary report
    Report,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Json,
        ExportFormat::Postman,
        ExportFormat::Markdown,
        ExportFormat::Report,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Postman => "postman",
            ExportFormat::Markdown => "markdown",
            ExportFormat::Report => "report",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            _ => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" | "raw" => Ok(ExportFormat::Json),
            "postman" | "collection" => Ok(ExportFormat::Postman),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "report" => Ok(ExportFormat::Report),
            _ => Err(ValidationError::MalformedPair {
                expected: "one of json, postman, markdown, report",
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variable names that look like credentials
pub fn is_secret(key: &str) -> bool {
    let key = key.to_lowercase();
    SECRET_MARKERS.iter().any(|marker| key.contains(marker))
}

/// `environment_dev_20261018_093000.json`
pub fn export_filename(kind: &str, name: &str, format: ExportFormat, at: DateTime<Utc>) -> String {
    let name: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let prefix = match format {
        ExportFormat::Postman => format!("postman_{}", kind),
        ExportFormat::Report => format!("{}_report", kind),
        _ => kind.to_string(),
    };
    format!(
        "{}_{}_{}.{}",
        prefix,
        name,
        at.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// GitHub-style heading anchor
pub(crate) fn anchor(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' | '/' => Some('-'),
            c if c.is_alphanumeric() || c == '-' || c == '_' => Some(c),
            _ => None,
        })
        .collect()
}

/// Escapes a value for a Markdown table cell
pub(crate) fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_is_secret() {
        assert!(is_secret("api_key"));
        assert!(is_secret("ACCESS_TOKEN"));
        assert!(is_secret("Authorization"));
        assert!(!is_secret("base_url"));
    }

    #[test]
    fn test_export_filename() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        assert_eq!(
            export_filename("environment", "dev env", ExportFormat::Json, at),
            "environment_dev_env_20261018_093000.json"
        );
        assert_eq!(
            export_filename("collection", "pets", ExportFormat::Postman, at),
            "postman_collection_pets_20261018_093000.json"
        );
        assert_eq!(
            export_filename("history", "all", ExportFormat::Markdown, at),
            "history_all_20261018_093000.md"
        );
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("MD".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert!("xml".parse::<ExportFormat>().is_err());
        for format in ExportFormat::ALL {
            assert_eq!(format.as_str().parse::<ExportFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_anchor() {
        assert_eq!(anchor("GET /users/{{id}}"), "get--users-id");
        assert_eq!(anchor("Users > Roles"), "users--roles");
    }
}
