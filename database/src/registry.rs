use chrono::{DateTime, Duration, Utc};
use cleaner_core::ChannelBlockEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const BLOCK_TTL_DAYS: i64 = 7;

pub fn block_ttl() -> Duration {
    Duration::days(BLOCK_TTL_DAYS)
}

/// Blocked account ids and when each was (last) blocked.
///
/// An entry expires once `now - blocked_at` exceeds seven days; an entry exactly seven
/// days old is still active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockRegistry {
    entries: BTreeMap<String, ChannelBlockEntry>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expired(entry: &ChannelBlockEntry, now: DateTime<Utc>) -> bool {
        now - entry.blocked_at > block_ttl()
    }

    /// Removes expired entries, returning how many were dropped.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !Self::is_expired(entry, now));
        before - self.entries.len()
    }

    pub fn contains_active(&self, account_id: &str, now: DateTime<Utc>) -> bool {
        self.entries
            .get(account_id)
            .is_some_and(|entry| !Self::is_expired(entry, now))
    }

    /// Inserts or refreshes `account_id`. Empty ids are never stored.
    pub fn upsert(&mut self, account_id: &str, blocked_at: DateTime<Utc>) -> bool {
        if account_id.is_empty() {
            return false;
        }
        self.entries
            .insert(account_id.to_string(), ChannelBlockEntry::new(blocked_at));
        true
    }

    pub fn get(&self, account_id: &str) -> Option<&ChannelBlockEntry> {
        self.entries.get(account_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
