// In-process backend; optional byte quota to mimic a full browser storage area

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::{KeyValueStore, StorageError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    /// Max total bytes across all values.
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            quota: Some(quota_bytes),
        }
    }

    /// Bytes currently stored.
    pub fn used_bytes(&self) -> usize {
        self.values.lock().values().map(String::len).sum()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock();
        if let Some(limit) = self.quota {
            let others: usize = values
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            let needed = others + value.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded(format!(
                    "{needed} bytes needed, {limit} allowed"
                )));
            }
        }
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
