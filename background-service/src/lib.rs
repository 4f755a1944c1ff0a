//! Work that runs independently of any open page: install-time defaults, the
//! periodic block-registry sweep and persisting quota notifications.

use chrono::Utc;
use cleaner_core::{CoreError, ErrorSink, FailureKind, Message, MessageBus};
use database::state::{initialize_defaults, load_settings, prune_registry, set_quota_exceeded};
use database::{StateKey, StateStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const DEFAULT_SWEEP_INTERVAL_HOURS: u64 = 24;

struct Running {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

pub struct BackgroundService {
    sweep_interval: Duration,
    store: Arc<dyn StateStore>,
    bus: MessageBus,
    sink: Arc<dyn ErrorSink>,
    running: Mutex<Option<Running>>,
}

impl BackgroundService {
    pub fn new(
        sweep_interval_hours: u64,
        store: Arc<dyn StateStore>,
        bus: MessageBus,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            sweep_interval: Duration::from_secs(sweep_interval_hours * 60 * 60),
            store,
            bus,
            sink,
            running: Mutex::new(None),
        }
    }

    pub fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Writes defaults for any persisted key that has no value yet.
    pub async fn install(&self) -> Result<Vec<StateKey>, CoreError> {
        Ok(initialize_defaults(self.store.as_ref()).await?)
    }

    pub async fn run_sweep_once(&self) -> Result<usize, CoreError> {
        sweep(self.store.as_ref()).await
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Spawns the sweep timer and the quota listener. The first sweep runs one
    /// interval after start.
    pub async fn start(&self) -> Result<(), CoreError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(CoreError::Internal {
                message: "background service already running".to_string(),
            });
        }

        let (shutdown, shutdown_rx) = oneshot::channel();
        let worker = Worker {
            sweep_interval: self.sweep_interval,
            store: self.store.clone(),
            sink: self.sink.clone(),
            messages: self.bus.subscribe(),
        };
        let task = tokio::spawn(worker.run(shutdown_rx));

        info!(
            sweep_interval_secs = self.sweep_interval.as_secs(),
            "Background service started"
        );
        *running = Some(Running { shutdown, task });
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), CoreError> {
        let Some(running) = self.running.lock().await.take() else {
            return Ok(());
        };

        let _ = running.shutdown.send(());
        running.task.await.map_err(|e| CoreError::Internal {
            message: format!("background task failed: {e}"),
        })?;
        info!("Background service stopped");
        Ok(())
    }
}

async fn sweep(store: &dyn StateStore) -> Result<usize, CoreError> {
    let (registry, removed) = prune_registry(store, Utc::now()).await?;
    info!(removed, remaining = registry.len(), "Block registry sweep finished");
    Ok(removed)
}

/// Persists the quota flag, but only while an API key is stored.
pub async fn persist_quota_flag(store: &dyn StateStore) -> Result<bool, CoreError> {
    let settings = load_settings(store).await?;
    if !settings.has_api_key() {
        debug!("Quota notification ignored, no API key stored");
        return Ok(false);
    }
    set_quota_exceeded(store, true).await?;
    Ok(true)
}

struct Worker {
    sweep_interval: Duration,
    store: Arc<dyn StateStore>,
    sink: Arc<dyn ErrorSink>,
    messages: broadcast::Receiver<Message>,
}

impl Worker {
    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        let mut ticker = interval_at(Instant::now() + self.sweep_interval, self.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut messages_open = true;

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Err(e) = sweep(self.store.as_ref()).await {
                        self.sink.report(FailureKind::PersistenceFailure, &e);
                    }
                }
                message = self.messages.recv(), if messages_open => match message {
                    Ok(Message::QuotaExceeded) => {
                        if let Err(e) = persist_quota_flag(self.store.as_ref()).await {
                            self.sink.report(FailureKind::PersistenceFailure, &e);
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Background service lagged behind the message bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => messages_open = false,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests;
