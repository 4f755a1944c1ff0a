//! Typed operations over the persisted record.
//!
//! Each mutating helper is a read-modify-write of one or two keys. Another page
//! instance writing the same key in between is overwritten, not merged.

use crate::blocked_log::BlockedItemLog;
use crate::registry::BlockRegistry;
use crate::store::{get_typed, to_value, StateKey, StateStore};
use chrono::{DateTime, Utc};
use cleaner_core::{BlockedItemEntry, Settings, StorageError};
use serde_json::{json, Value};
use tracing::{debug, info};

pub async fn load_settings(store: &dyn StateStore) -> Result<Settings, StorageError> {
    let defaults = Settings::default();
    Ok(Settings {
        enabled: get_typed::<bool>(store, StateKey::Enabled)
            .await?
            .unwrap_or(defaults.enabled),
        api_key: get_typed::<String>(store, StateKey::ApiKey)
            .await?
            .unwrap_or(defaults.api_key),
        verbose_logging: get_typed::<bool>(store, StateKey::VerboseLogging)
            .await?
            .unwrap_or(defaults.verbose_logging),
    })
}

pub async fn load_suppressed_count(store: &dyn StateStore) -> Result<u64, StorageError> {
    Ok(get_typed::<u64>(store, StateKey::SuppressedCount)
        .await?
        .unwrap_or(0))
}

pub async fn load_registry(store: &dyn StateStore) -> Result<BlockRegistry, StorageError> {
    Ok(get_typed::<BlockRegistry>(store, StateKey::BlockedChannels)
        .await?
        .unwrap_or_default())
}

pub async fn save_registry(
    store: &dyn StateStore,
    registry: &BlockRegistry,
) -> Result<(), StorageError> {
    store
        .set(
            StateKey::BlockedChannels,
            to_value(StateKey::BlockedChannels, registry)?,
        )
        .await
}

/// Loads the registry, drops expired entries and writes the pruned set back.
///
/// Returns the surviving registry and the number of entries removed. Nothing is
/// written when no registry has been persisted yet.
pub async fn prune_registry(
    store: &dyn StateStore,
    now: DateTime<Utc>,
) -> Result<(BlockRegistry, usize), StorageError> {
    let Some(mut registry) = get_typed::<BlockRegistry>(store, StateKey::BlockedChannels).await?
    else {
        return Ok((BlockRegistry::new(), 0));
    };

    let removed = registry.prune(now);
    save_registry(store, &registry).await?;
    debug!(removed, remaining = registry.len(), "Pruned block registry");
    Ok((registry, removed))
}

/// Upserts `account_id` with `now` into the persisted registry.
pub async fn record_blocked_channel(
    store: &dyn StateStore,
    account_id: &str,
    now: DateTime<Utc>,
) -> Result<bool, StorageError> {
    if account_id.is_empty() {
        return Ok(false);
    }
    let mut registry = load_registry(store).await?;
    registry.upsert(account_id, now);
    save_registry(store, &registry).await?;
    Ok(true)
}

pub async fn load_blocked_items(store: &dyn StateStore) -> Result<BlockedItemLog, StorageError> {
    let entries = get_typed::<Vec<BlockedItemEntry>>(store, StateKey::BlockedItems)
        .await?
        .unwrap_or_default();
    Ok(BlockedItemLog::from_entries(entries))
}

/// Appends `entry` to the audit log and stores `suppressed_count` in the same write.
///
/// Returns the log length after trimming.
pub async fn record_suppression(
    store: &dyn StateStore,
    entry: BlockedItemEntry,
    suppressed_count: u64,
) -> Result<usize, StorageError> {
    let mut log = load_blocked_items(store).await?;
    log.push(entry);
    store
        .set_many(vec![
            (StateKey::BlockedItems, to_value(StateKey::BlockedItems, &log)?),
            (StateKey::SuppressedCount, json!(suppressed_count)),
        ])
        .await?;
    Ok(log.len())
}

pub async fn is_quota_exceeded(store: &dyn StateStore) -> Result<bool, StorageError> {
    Ok(get_typed::<bool>(store, StateKey::QuotaExceeded)
        .await?
        .unwrap_or(false))
}

pub async fn set_quota_exceeded(store: &dyn StateStore, exceeded: bool) -> Result<(), StorageError> {
    store.set(StateKey::QuotaExceeded, json!(exceeded)).await
}

/// Stores `api_key` unless a non-empty key is already persisted.
pub async fn seed_api_key(store: &dyn StateStore, api_key: &str) -> Result<bool, StorageError> {
    let existing = get_typed::<String>(store, StateKey::ApiKey)
        .await?
        .unwrap_or_default();
    if !existing.trim().is_empty() || api_key.trim().is_empty() {
        return Ok(false);
    }
    store
        .set_many(vec![
            (StateKey::ApiKey, json!(api_key.trim())),
            (StateKey::QuotaExceeded, json!(false)),
        ])
        .await?;
    Ok(true)
}

fn default_value(key: StateKey) -> Value {
    match key {
        StateKey::Enabled => json!(true),
        StateKey::ApiKey => json!(""),
        StateKey::SuppressedCount => json!(0),
        StateKey::BlockedChannels => json!({}),
        StateKey::BlockedItems => json!([]),
        StateKey::QuotaExceeded => json!(false),
        StateKey::VerboseLogging => json!(false),
    }
}

/// Writes install-time defaults for every key that has no value yet.
pub async fn initialize_defaults(store: &dyn StateStore) -> Result<Vec<StateKey>, StorageError> {
    let mut missing = Vec::new();
    for key in StateKey::ALL {
        if store.get(key).await?.is_none() {
            missing.push(key);
        }
    }

    if !missing.is_empty() {
        store
            .set_many(missing.iter().map(|key| (*key, default_value(*key))).collect())
            .await?;
        info!(keys = ?missing, "Initialized default state");
    }
    Ok(missing)
}
