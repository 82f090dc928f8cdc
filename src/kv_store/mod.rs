// Key-value persistence port. The log store saves its whole buffer under one key.

mod file;
mod memory;
mod sqlite;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend refused the write for lack of space. The log store reacts by
    /// shrinking its buffer and retrying once.
    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded(_))
    }
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Opens the backend selected in config.
pub async fn open(config: &StorageConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => Arc::new(FileStore::open(&config.path).await?),
        StorageBackend::Sqlite => {
            let repo = SqliteStore::connect(&config.path).await?;
            repo.init().await?;
            Arc::new(repo)
        }
    };
    tracing::info!(backend = ?config.backend, path = %config.path, "log storage opened");
    Ok(store)
}
