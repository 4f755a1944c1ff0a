use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// Session-lived memo of remote scores keyed by `text::username`.
///
/// Concurrent lookups of the same key share one initialization, so identical
/// comments found in the same rescan still produce a single remote call. A failed
/// initialization leaves the slot empty for the next caller.
#[derive(Debug, Default)]
pub struct ClassificationCache {
    slots: Mutex<HashMap<String, Arc<OnceCell<u8>>>>,
}

impl ClassificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Arc<OnceCell<u8>> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(key.to_string()).or_default().clone()
    }

    pub fn get(&self, key: &str) -> Option<u8> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.get(key).and_then(|cell| cell.get().copied())
    }

    pub async fn get_or_try_init<F, Fut, E>(&self, key: &str, init: F) -> Result<u8, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<u8, E>>,
    {
        let cell = self.slot(key);
        cell.get_or_try_init(init).await.copied()
    }

    /// Number of keys holding a score.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
