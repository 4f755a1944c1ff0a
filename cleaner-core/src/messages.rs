//! Cross-component notifications.
//!
//! Delivery is an at-most-once broadcast: publishing never blocks, and a message
//! sent while nobody listens, or to a receiver that lagged, is simply gone.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerSeverity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Message {
    #[serde(rename_all = "camelCase")]
    SettingsChanged { enabled: bool, api_key: String },
    StatsReset,
    QuotaExceeded,
    ShowBanner {
        message: String,
        severity: BannerSeverity,
    },
    VerboseLoggingChanged { verbose: bool },
}

impl Message {
    pub fn banner(message: impl Into<String>, severity: BannerSeverity) -> Self {
        Message::ShowBanner {
            message: message.into(),
            severity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MessageBus {
    sender: broadcast::Sender<Message>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.sender.subscribe()
    }

    /// Returns how many receivers the message reached.
    pub fn publish(&self, message: Message) -> usize {
        match self.sender.send(message) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(message)) => {
                trace!(?message, "No subscribers for message");
                0
            }
        }
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}
