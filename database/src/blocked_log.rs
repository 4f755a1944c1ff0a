use cleaner_core::BlockedItemEntry;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const BLOCKED_LOG_CAPACITY: usize = 100;

/// Chronological audit trail of suppressed comments, capped at the most recent 100.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockedItemLog {
    items: VecDeque<BlockedItemEntry>,
}

impl BlockedItemLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = BlockedItemEntry>) -> Self {
        let mut log = Self::new();
        for entry in entries {
            log.push(entry);
        }
        log
    }

    /// Appends `entry`, dropping the oldest entries beyond capacity.
    pub fn push(&mut self, entry: BlockedItemEntry) {
        self.items.push_back(entry);
        while self.items.len() > BLOCKED_LOG_CAPACITY {
            self.items.pop_front();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockedItemEntry> {
        self.items.iter()
    }

    pub fn oldest(&self) -> Option<&BlockedItemEntry> {
        self.items.front()
    }

    pub fn newest(&self) -> Option<&BlockedItemEntry> {
        self.items.back()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
