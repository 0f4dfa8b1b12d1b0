//! Error taxonomy
//!
//! Every error is caught at the boundary of the operation that produced it.
//! Network failures never appear here: the executor folds them into its
//! result record (see [`crate::network::NetworkError`]).

use thiserror::Error;

/// An uploaded document is not valid JSON. Fatal to the parse, nothing else.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed JSON at line {line}, column {column}: {message}")]
    Malformed {
        line: usize,
        column: usize,
        message: String,
    },
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        ParseError::Malformed {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}

/// Input rejected before any work was done.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{entity} {id} does not exist")]
    NotFound { entity: &'static str, id: i64 },

    #[error("no {entity} named '{name}'")]
    UnknownName { entity: &'static str, name: String },

    #[error("no environment is active")]
    NoActiveEnvironment,

    #[error("name must not be empty")]
    EmptyName,

    #[error("unsupported HTTP method: {0}")]
    UnknownMethod(String),

    #[error("expected {expected}, got '{input}'")]
    MalformedPair { expected: &'static str, input: String },

    #[error("invalid import file: {0}")]
    InvalidImport(String),

    #[error("endpoint {method} {path} not found in documentation {doc_id}")]
    UnknownEndpoint {
        doc_id: i64,
        method: String,
        path: String,
    },
}

/// Failures of the persistence gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Umbrella error of the application layer.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => {
                AppError::Validation(ValidationError::NotFound { entity, id })
            }
            other => AppError::Store(other),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
