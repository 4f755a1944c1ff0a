use crate::cache::ClassificationCache;
use async_trait::async_trait;
use cleaner_core::{
    BannerSeverity, ClassifierError, CommentRecord, CoreError, ErrorExt, ErrorSink, FailureKind,
    Message, MessageBus,
};
use database::state::set_quota_exceeded;
use database::StateStore;
use regex::Regex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, RwLock};
use tracing::{debug, info, warn};

pub const MIN_REMOTE_SCORE: u8 = 1;
pub const MAX_REMOTE_SCORE: u8 = 10;

static LEADING_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?)([0-9]+)").expect("valid regex"));

/// A text-generation endpoint that answers a scoring prompt.
#[async_trait]
pub trait ScoringBackend: Send + Sync {
    fn provider(&self) -> &str;

    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String, ClassifierError>;
}

pub fn build_prompt(record: &CommentRecord) -> String {
    format!(
        "Score 1-10 If this comment is written by AI: {}\nUser: {}",
        record.text, record.username
    )
}

/// Reads the leading integer of `raw` and clamps it into 1..=10.
pub fn parse_score(raw: &str) -> Result<u8, ClassifierError> {
    let captures = LEADING_INTEGER
        .captures(raw)
        .ok_or_else(|| ClassifierError::UnparsableScore {
            raw: raw.to_string(),
        })?;

    if &captures[1] == "-" {
        return Ok(MIN_REMOTE_SCORE);
    }

    let value = captures[2].parse::<u64>().unwrap_or(u64::MAX);
    Ok(value.clamp(MIN_REMOTE_SCORE as u64, MAX_REMOTE_SCORE as u64) as u8)
}

/// Quota-aware, cache-backed remote scorer.
///
/// Every failure degrades to a score of 0. Once the backend reports quota
/// exhaustion no further calls are made until a different API key is set.
pub struct RemoteClassifier {
    backend: Arc<dyn ScoringBackend>,
    cache: ClassificationCache,
    api_key: RwLock<String>,
    quota_exhausted: AtomicBool,
    calls: AtomicUsize,
    bus: MessageBus,
    store: Arc<dyn StateStore>,
    sink: Arc<dyn ErrorSink>,
}

impl RemoteClassifier {
    pub fn new(
        backend: Arc<dyn ScoringBackend>,
        bus: MessageBus,
        store: Arc<dyn StateStore>,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            backend,
            cache: ClassificationCache::new(),
            api_key: RwLock::new(String::new()),
            quota_exhausted: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            bus,
            store,
            sink,
        }
    }

    pub fn api_key(&self) -> String {
        self.api_key
            .read()
            .map(|key| key.clone())
            .unwrap_or_default()
    }

    /// Replaces the API key. A different key clears the quota latch.
    pub fn set_api_key(&self, api_key: &str) -> bool {
        let api_key = api_key.trim();
        let mut current = self.api_key.write().unwrap_or_else(|e| e.into_inner());
        if *current == api_key {
            return false;
        }
        *current = api_key.to_string();
        if self.quota_exhausted.swap(false, Ordering::SeqCst) {
            info!("API key changed, remote classification resumed");
        }
        true
    }

    pub fn is_quota_exhausted(&self) -> bool {
        self.quota_exhausted.load(Ordering::SeqCst)
    }

    /// Backend calls issued so far this session.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn cache(&self) -> &ClassificationCache {
        &self.cache
    }

    pub async fn classify(&self, record: &CommentRecord) -> u8 {
        let key = record.cache_key();
        if let Some(score) = self.cache.get(&key) {
            debug!(source = %record.source, score, "Classification cache hit");
            return score;
        }

        let api_key = self.api_key();
        if api_key.is_empty() {
            debug!(source = %record.source, "No API key, skipping remote classification");
            return 0;
        }
        if self.is_quota_exhausted() {
            debug!(source = %record.source, "Quota exhausted, skipping remote classification");
            return 0;
        }

        let result = self
            .cache
            .get_or_try_init(&key, || async {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let raw = self.backend.generate(&api_key, &build_prompt(record)).await?;
                parse_score(&raw)
            })
            .await;

        match result {
            Ok(score) => {
                debug!(source = %record.source, score, provider = self.backend.provider(), "Remote score");
                score
            }
            Err(error) => {
                self.handle_failure(error).await;
                0
            }
        }
    }

    async fn handle_failure(&self, error: ClassifierError) {
        if error.failure_kind() != FailureKind::QuotaExceeded {
            self.sink.report_default(&CoreError::from(error));
            return;
        }

        if !self.quota_exhausted.swap(true, Ordering::SeqCst) {
            warn!(provider = self.backend.provider(), "Remote quota exhausted");
            self.bus.publish(Message::QuotaExceeded);
            self.bus.publish(Message::banner(
                error.user_friendly_message(),
                BannerSeverity::Warning,
            ));
            if let Err(e) = set_quota_exceeded(self.store.as_ref(), true).await {
                self.sink.report_default(&CoreError::from(e));
            }
        }
        self.sink
            .report(FailureKind::QuotaExceeded, &CoreError::from(error));
    }
}
