//! Layered configuration: defaults, then `~/.apidash/config.yaml`, then
//! environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DATABASE_FILE_NAME, DEFAULT_BASE_URL_VARIABLE,
    DEFAULT_HISTORY_LIMIT, DEFAULT_TIMEOUT_SECS,
};

/// Runtime configuration.
///
/// | Env Var                 | Default                           |
/// |-------------------------|-----------------------------------|
/// | `DATABASE_URL`          | `sqlite://~/.apidash/apidash.db`  |
/// | `APIDASH_TIMEOUT_SECS`  | `30`                              |
/// | `APIDASH_HISTORY_LIMIT` | `50`                              |
/// | `APIDASH_BASE_URL_VAR`  | `base_url`                        |
/// | `APIDASH_LOG_DIR`       | `~/.apidash`                      |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_url: String,
    /// Ceiling for one outbound request
    pub request_timeout_secs: u64,
    /// Default number of rows for history listings
    pub history_limit: i64,
    /// Token prefixed to relative endpoint paths
    pub base_url_variable: String,
    pub log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let dir = config_dir();
        Config {
            database_url: format!("sqlite://{}", dir.join(DATABASE_FILE_NAME).display()),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            base_url_variable: DEFAULT_BASE_URL_VARIABLE.to_string(),
            log_dir: dir,
        }
    }
}

/// `~/.apidash`, or `./.apidash` when there is no home directory
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

impl Config {
    /// Reads the user's config file and the process environment
    pub fn load() -> Self {
        Config::load_from(&config_dir().join(CONFIG_FILE_NAME), |key| {
            std::env::var(key).ok()
        })
    }

    /// Reads `path` (if present) and applies overrides from `lookup`
    pub fn load_from<F>(path: &Path, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::from_file(path).unwrap_or_default();
        config.apply_env(lookup);
        config
    }

    /// `None` when the file is missing or unreadable
    fn from_file(path: &Path) -> Option<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no config file");
                return None;
            }
        };
        match serde_yaml::from_str::<Config>(&text) {
            Ok(mut config) => {
                debug!(path = %path.display(), "loaded config file");
                if config.request_timeout_secs == 0 {
                    warn!(path = %path.display(), "ignoring zero request_timeout_secs");
                    config.request_timeout_secs = DEFAULT_TIMEOUT_SECS;
                }
                Some(config)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring invalid config file");
                None
            }
        }
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            self.database_url = url;
        }
        match parse_override::<_, u64>(&lookup, "APIDASH_TIMEOUT_SECS") {
            Some(0) => warn!(key = "APIDASH_TIMEOUT_SECS", "ignoring zero timeout"),
            Some(secs) => self.request_timeout_secs = secs,
            None => {}
        }
        if let Some(limit) = parse_override(&lookup, "APIDASH_HISTORY_LIMIT") {
            self.history_limit = limit;
        }
        if let Some(var) = lookup("APIDASH_BASE_URL_VAR").filter(|v| !v.trim().is_empty()) {
            self.base_url_variable = var.trim().to_string();
        }
        if let Some(dir) = lookup("APIDASH_LOG_DIR").filter(|v| !v.trim().is_empty()) {
            self.log_dir = PathBuf::from(dir);
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_override<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring invalid numeric override");
            None
        }
    }
}
