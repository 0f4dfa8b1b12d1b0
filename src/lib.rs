//! # apidash
//!
//! Explore API documentation and exercise its endpoints against switchable
//! environments, with every request kept in a persistent history.
//!
//! ## Features
//! - Documentation upload: category maps, endpoint lists, OpenAPI paths and
//!   nested tables of contents, parsed into a navigation tree
//! - `{{variable}}` templates resolved against the active environment
//! - HTTP execution with a fixed timeout; failures are recorded, not raised
//! - Request history with filters
//! - Import/export: JSON, Postman, Markdown
//! - cURL import/export
//!
//! ## Architecture
//! - Parser, template resolver and executor are independent of storage
//! - Storage (SQLite via sqlx) owns documentation, environments and history
//! - [`app::Dashboard`] runs each user action end to end

pub mod app;
pub mod config;
pub mod constants;
pub mod curl;
pub mod display;
pub mod error;
pub mod export;
pub mod models;
pub mod network;
pub mod parser;
pub mod storage;
pub mod template;

// Re-export commonly used types
pub use app::{Dashboard, Execution, Preview, RequestOverrides};
pub use config::Config;
pub use curl::{parse_curl, to_curl};
pub use error::{AppError, AppResult, ParseError, StoreError, ValidationError};
pub use models::{AuthType, Documentation, Environment, Header, HistoryEntry, HttpMethod, RequestSpec};
pub use network::{ExecutionResult, Executor};
pub use parser::{parse_str, parse_value, Endpoint, NavigationNode, ParseWarning, ParsedDocument};
pub use storage::{HistoryFilter, Storage};
