//! App layer - the operations behind every command
//!
//! [`Dashboard`] ties the parser, resolver, executor and storage together:
//! upload -> parse -> save, select endpoint -> resolve -> execute -> append
//! history. Each method is one user action, run to completion.

pub mod commands;
mod documents;
mod environments;

pub use commands::{Execution, Preview, RequestOverrides};
pub use documents::{OpenDocument, UploadOutcome};

use crate::config::Config;
use crate::error::AppResult;
use crate::network::Executor;
use crate::storage::Storage;

pub struct Dashboard {
    storage: Storage,
    executor: Executor,
    config: Config,
}

impl Dashboard {
    /// Opens the configured database and builds an executor with the
    /// configured timeout
    pub async fn open(config: Config) -> AppResult<Self> {
        let storage = Storage::open(&config.database_url).await?;
        Ok(Dashboard::with_storage(storage, config))
    }

    /// Dashboard over a private in-memory database
    pub async fn in_memory(config: Config) -> AppResult<Self> {
        let storage = Storage::open_in_memory().await?;
        Ok(Dashboard::with_storage(storage, config))
    }

    pub fn with_storage(storage: Storage, config: Config) -> Self {
        let executor = Executor::new(config.request_timeout());
        Dashboard {
            storage,
            executor,
            config,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn close(&self) {
        self.storage.close().await;
    }
}
