//! One page's comment-cleaning context.
//!
//! The pipeline owns the page document, the Seen-set and the remote classifier
//! (and with it the classification cache). Persistence, the scoring backend,
//! the message bus and the error sink are injected at construction.

use crate::decision::{final_score, should_suppress, SuppressionReason, Verdict};
use crate::session::SeenSet;
use chrono::Utc;
use cleaner_core::{
    BannerSeverity, BlockedItemEntry, ClassifierError, CommentId, CommentRecord, CoreError,
    ErrorExt, ErrorSink, FailureKind, Message, MessageBus, Settings,
};
use comment_classifier::{passes_like_gate, score_heuristics, RemoteClassifier, ScoringBackend};
use comment_extractor::{extract_comment, NodeId, PageDocument};
use database::state::{
    is_quota_exceeded, load_settings, load_suppressed_count, prune_registry,
    record_blocked_channel, record_suppression,
};
use database::{BlockRegistry, StateStore};
use futures::future::join_all;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::sync::Arc;
use tracing::{debug, info, warn};

const LOG_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Ready,
    /// No API key is stored; the watcher should not be started.
    MissingApiKey,
}

/// What the watcher should do after a message was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageEffect {
    None,
    RescanNow,
    CancelPending,
}

/// Comment elements admitted by one rescan, in document query order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Admission {
    pub candidates: usize,
    pub comments: Vec<(NodeId, CommentId)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RescanSummary {
    pub candidates: usize,
    pub admitted: usize,
    pub suppressed: usize,
}

#[derive(Debug, Default)]
struct SessionState {
    enabled: bool,
    suppressed_count: u64,
    blocked_accounts: BlockRegistry,
}

pub struct CommentPipeline {
    document: RefCell<PageDocument>,
    seen: RefCell<SeenSet>,
    state: RefCell<SessionState>,
    rescans: Cell<u64>,
    classifier: RemoteClassifier,
    store: Arc<dyn StateStore>,
    bus: MessageBus,
    sink: Arc<dyn ErrorSink>,
    persist_lock: tokio::sync::Mutex<()>,
}

impl CommentPipeline {
    pub fn new(
        document: PageDocument,
        store: Arc<dyn StateStore>,
        backend: Arc<dyn ScoringBackend>,
        bus: MessageBus,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        let classifier = RemoteClassifier::new(backend, bus.clone(), store.clone(), sink.clone());
        Self {
            document: RefCell::new(document),
            seen: RefCell::new(SeenSet::new()),
            state: RefCell::new(SessionState::default()),
            rescans: Cell::new(0),
            classifier,
            store,
            bus,
            sink,
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Loads settings and the pruned block registry, and publishes startup banners.
    pub async fn start(&self) -> StartOutcome {
        let settings = match load_settings(self.store.as_ref()).await {
            Ok(settings) => settings,
            Err(e) => {
                self.report(FailureKind::PersistenceFailure, e.into());
                Settings::default()
            }
        };

        let suppressed_count = match load_suppressed_count(self.store.as_ref()).await {
            Ok(count) => count,
            Err(e) => {
                self.report(FailureKind::PersistenceFailure, e.into());
                0
            }
        };

        let blocked_accounts = match prune_registry(self.store.as_ref(), Utc::now()).await {
            Ok((registry, removed)) => {
                if removed > 0 {
                    info!(removed, "Dropped expired blocked accounts");
                }
                registry
            }
            Err(e) => {
                self.report(FailureKind::PersistenceFailure, e.into());
                BlockRegistry::new()
            }
        };

        self.classifier.set_api_key(&settings.api_key);
        {
            let mut state = self.state.borrow_mut();
            state.enabled = settings.enabled;
            state.suppressed_count = suppressed_count;
            state.blocked_accounts = blocked_accounts;
            info!(
                enabled = state.enabled,
                has_api_key = settings.has_api_key(),
                suppressed_count = state.suppressed_count,
                blocked_accounts = state.blocked_accounts.len(),
                "Pipeline settings loaded"
            );
        }

        if !settings.has_api_key() {
            let missing = ClassifierError::MissingApiKey {
                provider: "gemini".to_string(),
            };
            self.bus.publish(Message::banner(
                missing.user_friendly_message(),
                BannerSeverity::Error,
            ));
            warn!("No API key configured, comment analysis not started");
            return StartOutcome::MissingApiKey;
        }

        match is_quota_exceeded(self.store.as_ref()).await {
            Ok(true) => {
                let quota = ClassifierError::QuotaExceeded {
                    provider: "gemini".to_string(),
                    status_code: None,
                    details: "persisted flag".to_string(),
                };
                self.bus.publish(Message::banner(
                    quota.user_friendly_message(),
                    BannerSeverity::Warning,
                ));
            }
            Ok(false) => {}
            Err(e) => self.report(FailureKind::PersistenceFailure, e.into()),
        }

        StartOutcome::Ready
    }

    pub fn is_enabled(&self) -> bool {
        self.state.borrow().enabled
    }

    pub fn suppressed_count(&self) -> u64 {
        self.state.borrow().suppressed_count
    }

    /// Whether `account_id` has an unexpired entry in the session's block set.
    pub fn is_account_blocked(&self, account_id: &str) -> bool {
        self.state
            .borrow()
            .blocked_accounts
            .contains_active(account_id, Utc::now())
    }

    pub fn rescan_count(&self) -> u64 {
        self.rescans.get()
    }

    pub fn classifier(&self) -> &RemoteClassifier {
        &self.classifier
    }

    pub fn document(&self) -> Ref<'_, PageDocument> {
        self.document.borrow()
    }

    pub fn document_mut(&self) -> RefMut<'_, PageDocument> {
        self.document.borrow_mut()
    }

    pub fn verdict_for(&self, node: NodeId) -> Option<Verdict> {
        let seen = self.seen.borrow();
        seen.id_of(node).and_then(|id| seen.verdict(id))
    }

    pub fn seen_count(&self) -> usize {
        self.seen.borrow().len()
    }

    /// Admits every comment container not seen before, without analyzing it.
    ///
    /// Admits nothing while the pipeline is disabled.
    pub fn admit_new(&self) -> Admission {
        if !self.is_enabled() {
            debug!("Pipeline disabled, rescan skipped");
            return Admission::default();
        }
        self.rescans.set(self.rescans.get() + 1);

        let candidates = self.document.borrow().comment_candidates();
        let mut seen = self.seen.borrow_mut();
        let comments = candidates
            .iter()
            .filter_map(|node| seen.admit(*node).map(|id| (*node, id)))
            .collect();
        Admission {
            candidates: candidates.len(),
            comments,
        }
    }

    /// Admits new comment containers and waits until all of their analyses finish.
    ///
    /// Analyses run concurrently and may finish in any order.
    pub async fn rescan(&self) -> RescanSummary {
        let admission = self.admit_new();
        let verdicts = join_all(
            admission
                .comments
                .iter()
                .map(|(node, id)| self.analyze(*node, *id)),
        )
        .await;

        let summary = RescanSummary {
            candidates: admission.candidates,
            admitted: admission.comments.len(),
            suppressed: verdicts.iter().filter(|v| v.is_suppressed()).count(),
        };
        debug!(
            candidates = summary.candidates,
            admitted = summary.admitted,
            suppressed = summary.suppressed,
            "Rescan finished"
        );
        summary
    }

    /// Decides one admitted comment and records the verdict in the Seen-set.
    pub async fn analyze(&self, node: NodeId, id: CommentId) -> Verdict {
        let verdict = self.decide(node, id).await;
        self.seen.borrow_mut().settle(id, verdict);
        debug!(comment_id = %id, verdict = verdict.as_str(), "Comment analyzed");
        verdict
    }

    async fn decide(&self, node: NodeId, id: CommentId) -> Verdict {
        let extracted = extract_comment(&self.document.borrow(), node, id);
        let record = match extracted {
            Ok(record) => record,
            Err(e) => {
                self.report(FailureKind::ExtractionMiss, e.into());
                return Verdict::NotAComment;
            }
        };

        debug!(
            comment_id = %id,
            text = %record.preview(30),
            username = %record.username,
            likes = record.like_count,
            account_id = %record.account_id,
            "Analyzing comment"
        );

        if !passes_like_gate(&record) {
            return Verdict::BelowLikeGate;
        }

        if !record.account_id.is_empty() && self.is_account_blocked(&record.account_id) {
            info!(
                comment_id = %id,
                username = %record.username,
                account_id = %record.account_id,
                "Suppressing comment from blocked account"
            );
            if !self.suppress(node, &record).await {
                return Verdict::AlreadySuppressed;
            }
            return Verdict::Suppressed(SuppressionReason::BlockedAccount);
        }

        let heuristic = score_heuristics(&record);
        if heuristic.is_zero() {
            return Verdict::NoSignals;
        }
        debug!(comment_id = %id, score = heuristic.total, signals = ?heuristic.signals, "Heuristic signals");

        let remote = self.classifier.classify(&record).await;
        if !should_suppress(heuristic.total, remote) {
            return Verdict::Kept {
                heuristic: heuristic.total,
                remote,
            };
        }

        info!(
            comment_id = %id,
            username = %record.username,
            text = %record.preview(LOG_PREVIEW_CHARS),
            score = final_score(heuristic.total, remote),
            "Suppressing AI comment"
        );
        if !self.suppress(node, &record).await {
            return Verdict::AlreadySuppressed;
        }
        self.block_account(&record.account_id).await;

        Verdict::Suppressed(SuppressionReason::Score {
            heuristic: heuristic.total,
            remote,
        })
    }

    /// Hides `node` and records the suppression, unless a related element of the
    /// same comment was already suppressed.
    async fn suppress(&self, node: NodeId, record: &CommentRecord) -> bool {
        let (entry, count) = {
            let mut document = self.document.borrow_mut();
            if document.overlaps_hidden(node) {
                document.hide(node);
                debug!(comment_id = %record.source, "Comment already suppressed");
                return false;
            }
            document.hide(node);
            let mut state = self.state.borrow_mut();
            state.suppressed_count += 1;
            let entry = BlockedItemEntry::from_record(record, document.url(), Utc::now());
            (entry, state.suppressed_count)
        };

        let _guard = self.persist_lock.lock().await;
        if let Err(e) = record_suppression(self.store.as_ref(), entry, count).await {
            self.report(FailureKind::PersistenceFailure, e.into());
        }
        true
    }

    async fn block_account(&self, account_id: &str) {
        if account_id.is_empty() {
            return;
        }
        let now = Utc::now();
        self.state
            .borrow_mut()
            .blocked_accounts
            .upsert(account_id, now);

        let _guard = self.persist_lock.lock().await;
        match record_blocked_channel(self.store.as_ref(), account_id, now).await {
            Ok(_) => info!(account_id, "Account blocked"),
            Err(e) => self.report(FailureKind::PersistenceFailure, e.into()),
        }
    }

    pub fn set_enabled(&self, enabled: bool) -> MessageEffect {
        let was_enabled = std::mem::replace(&mut self.state.borrow_mut().enabled, enabled);
        match (was_enabled, enabled) {
            (false, true) => {
                info!("Pipeline enabled");
                MessageEffect::RescanNow
            }
            (true, false) => {
                info!("Pipeline disabled");
                MessageEffect::CancelPending
            }
            _ => MessageEffect::None,
        }
    }

    /// Zeroes the session counter, forgets blocked accounts and unhides this page's comments.
    pub fn reset_stats(&self) -> usize {
        {
            let mut state = self.state.borrow_mut();
            state.suppressed_count = 0;
            state.blocked_accounts = BlockRegistry::new();
        }
        let revealed = self.document.borrow_mut().reveal_all();
        info!(revealed, "Statistics reset");
        revealed
    }

    pub fn handle_message(&self, message: &Message) -> MessageEffect {
        match message {
            Message::SettingsChanged { enabled, api_key } => {
                if self.classifier.set_api_key(api_key) {
                    debug!("API key updated");
                }
                self.set_enabled(*enabled)
            }
            Message::StatsReset => {
                self.reset_stats();
                MessageEffect::None
            }
            Message::QuotaExceeded
            | Message::ShowBanner { .. }
            | Message::VerboseLoggingChanged { .. } => MessageEffect::None,
        }
    }

    fn report(&self, kind: FailureKind, error: CoreError) {
        self.sink.report(kind, &error);
    }
}
