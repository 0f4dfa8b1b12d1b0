//! Application constants
//!
//! Centralized location for magic strings and configuration defaults.

/// Application name
pub const APP_NAME: &str = "apidash";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory (under the user's home) holding config, database and logs
pub const CONFIG_DIR_NAME: &str = ".apidash";

/// Config file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Database file name inside the config directory
pub const DATABASE_FILE_NAME: &str = "apidash.db";

/// Log file name inside the log directory
pub const LOG_FILE_NAME: &str = "apidash.log";

/// Ceiling for a single outbound request
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of history entries returned by a listing
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Variable prefixed to relative endpoint paths before resolution
pub const DEFAULT_BASE_URL_VARIABLE: &str = "base_url";

/// Category used when an endpoint declares none and its path has no literal segment
pub const ROOT_CATEGORY: &str = "root";

/// Separator between nested category labels in a flat category path
pub const CATEGORY_SEPARATOR: &str = " > ";

/// Conventional top-level keys, checked in this order
pub const TOC_KEY: &str = "toc_dictionary";
pub const ENDPOINTS_KEY: &str = "endpoints";
pub const PATHS_KEY: &str = "paths";

/// Postman collection schema used by collection exports
pub const POSTMAN_COLLECTION_SCHEMA: &str =
    "https://schema.getpostman.com/json/collection/v2.1.0/collection.json";

/// Substrings marking a variable as secret in exports
pub const SECRET_MARKERS: &[&str] = &["password", "token", "secret", "key", "auth"];
