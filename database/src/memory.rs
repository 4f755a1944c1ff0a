use crate::store::{StateKey, StateStore};
use async_trait::async_trait;
use cleaner_core::StorageError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Process-local [`StateStore`], used by tests and hosts without a database file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<StateKey, Value>>,
    reject_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every write fails with [`StorageError::WriteRejected`].
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Number of successful `set_many` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> HashMap<StateKey, Value> {
        self.values.read().await.clone()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: StateKey) -> Result<Option<Value>, StorageError> {
        Ok(self.values.read().await.get(&key).cloned())
    }

    async fn set_many(&self, entries: Vec<(StateKey, Value)>) -> Result<(), StorageError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            let key = entries
                .first()
                .map(|(key, _)| key.to_string())
                .unwrap_or_default();
            return Err(StorageError::WriteRejected { key });
        }

        let mut values = self.values.write().await;
        for (key, value) in entries {
            values.insert(key, value);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
