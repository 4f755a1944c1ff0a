use async_trait::async_trait;
use cleaner_core::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Keys of the persisted configuration and statistics record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateKey {
    Enabled,
    ApiKey,
    SuppressedCount,
    BlockedChannels,
    BlockedItems,
    QuotaExceeded,
    VerboseLogging,
}

impl StateKey {
    pub const ALL: [StateKey; 7] = [
        StateKey::Enabled,
        StateKey::ApiKey,
        StateKey::SuppressedCount,
        StateKey::BlockedChannels,
        StateKey::BlockedItems,
        StateKey::QuotaExceeded,
        StateKey::VerboseLogging,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::Enabled => "enabled",
            StateKey::ApiKey => "apiKey",
            StateKey::SuppressedCount => "suppressedCount",
            StateKey::BlockedChannels => "blockedChannels",
            StateKey::BlockedItems => "blockedItems",
            StateKey::QuotaExceeded => "quotaExceeded",
            StateKey::VerboseLogging => "verboseLogging",
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared durable key/value state.
///
/// Writes replace whole values; there is no compare-and-swap, so concurrent
/// read-modify-write cycles from two page instances resolve as last writer wins.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: StateKey) -> Result<Option<Value>, StorageError>;

    /// Writes all entries together; either every entry lands or none does.
    async fn set_many(&self, entries: Vec<(StateKey, Value)>) -> Result<(), StorageError>;

    async fn set(&self, key: StateKey, value: Value) -> Result<(), StorageError> {
        self.set_many(vec![(key, value)]).await
    }
}

pub async fn get_typed<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: StateKey,
) -> Result<Option<T>, StorageError> {
    match store.get(key).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StorageError::CorruptValue {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

pub fn to_value<T: Serialize>(key: StateKey, value: &T) -> Result<Value, StorageError> {
    serde_json::to_value(value).map_err(|e| StorageError::CorruptValue {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
