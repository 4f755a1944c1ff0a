use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between text and username in classification cache keys.
pub const CACHE_KEY_SEPARATOR: &str = "::";

/// Session-local identifier handed out to every discovered comment element.
///
/// Ids are assigned monotonically and never reused within a page session, so they
/// stand in for the UI-owned element without borrowing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommentId(pub u64);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "comment#{}", self.0)
    }
}

/// Normalized view of one comment, produced per extraction attempt and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    pub text: String,
    pub username: String,
    pub like_count: u64,
    /// Canonical channel id or handle; empty when the author link is absent.
    pub account_id: String,
    pub emphasized: bool,
    pub source: CommentId,
}

impl CommentRecord {
    pub fn cache_key(&self) -> String {
        format!("{}{}{}", self.text, CACHE_KEY_SEPARATOR, self.username)
    }

    /// First `max_chars` characters of the text, for log lines.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut preview: String = self.text.chars().take(max_chars).collect();
        if self.text.chars().count() > max_chars {
            preview.push_str("...");
        }
        preview
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBlockEntry {
    #[serde(rename = "blockedAt", alias = "timestamp")]
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub blocked_at: DateTime<Utc>,
}

impl ChannelBlockEntry {
    pub fn new(blocked_at: DateTime<Utc>) -> Self {
        Self { blocked_at }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedItemEntry {
    pub text: String,
    pub username: String,
    #[serde(alias = "channelId", default)]
    pub account_id: String,
    #[serde(alias = "videoUrl", default)]
    pub source_url: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl BlockedItemEntry {
    pub fn from_record(record: &CommentRecord, source_url: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            text: record.text.clone(),
            username: record.username.clone(),
            account_id: record.account_id.clone(),
            source_url: source_url.to_string(),
            timestamp,
        }
    }
}

/// User-facing switches shared with the options surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub enabled: bool,
    pub api_key: String,
    pub verbose_logging: bool,
}

impl Settings {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            verbose_logging: false,
        }
    }
}
