#![allow(dead_code)]

use async_trait::async_trait;
use cleaner_core::{ClassifierError, MessageBus, RecordingErrorSink};
use comment_classifier::ScoringBackend;
use comment_extractor::{NodeId, PageDocument};
use comment_pipeline::CommentPipeline;
use database::{MemoryStore, StateKey, StateStore};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PAGE_URL: &str = "https://www.youtube.com/watch?v=fixture";

/// Replies with a fixed score, or with a quota error once switched over.
pub struct CountingBackend {
    reply: Mutex<String>,
    delay: Mutex<Duration>,
    quota: AtomicBool,
    calls: AtomicUsize,
}

impl CountingBackend {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(reply.to_string()),
            delay: Mutex::new(Duration::ZERO),
            quota: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Makes every later call take `delay` before replying.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn exhaust_quota(&self) {
        self.quota.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ScoringBackend for CountingBackend {
    fn provider(&self) -> &str {
        "counting"
    }

    async fn generate(&self, _api_key: &str, _prompt: &str) -> Result<String, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }
        if self.quota.load(Ordering::SeqCst) {
            return Err(ClassifierError::QuotaExceeded {
                provider: "counting".to_string(),
                status_code: Some(429),
                details: "RESOURCE_EXHAUSTED".to_string(),
            });
        }
        Ok(self.reply.lock().unwrap().clone())
    }
}

pub struct CommentSpec<'a> {
    pub text: &'a str,
    pub author: &'a str,
    pub account: &'a str,
    pub likes: &'a str,
    pub bold: bool,
}

impl<'a> CommentSpec<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            author: "viewer",
            account: "UCviewer",
            likes: "250",
            bold: false,
        }
    }

    pub fn author(mut self, author: &'a str, account: &'a str) -> Self {
        self.author = author;
        self.account = account;
        self
    }

    pub fn likes(mut self, likes: &'a str) -> Self {
        self.likes = likes;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn html(&self) -> String {
        let weight = if self.bold { 500 } else { 400 };
        format!(
            r#"<ytd-comment-renderer>
                <div id="header">
                    <a id="author-text" href="/channel/{account}"><span>{author}</span></a>
                </div>
                <span dir="auto" style="font-weight: {weight}">{text}</span>
                <div id="toolbar"><span id="vote-count-middle">{likes}</span></div>
            </ytd-comment-renderer>"#,
            account = self.account,
            author = self.author,
            text = self.text,
            likes = self.likes,
        )
    }
}

pub fn page(comments: &[CommentSpec<'_>]) -> PageDocument {
    let body: String = comments.iter().map(CommentSpec::html).collect();
    PageDocument::parse(
        PAGE_URL,
        &format!(r#"<html><head></head><body><div id="comments">{body}</div></body></html>"#),
    )
}

pub struct Fixture {
    pub pipeline: CommentPipeline,
    pub store: Arc<MemoryStore>,
    pub backend: Arc<CountingBackend>,
    pub sink: Arc<RecordingErrorSink>,
    pub bus: MessageBus,
}

impl Fixture {
    pub fn renderers(&self) -> Vec<NodeId> {
        self.pipeline.document().comment_candidates()
    }
}

/// A store holding an API key and nothing else.
pub async fn keyed_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .set(StateKey::ApiKey, json!("test-key"))
        .await
        .unwrap();
    store
}

pub fn fixture_with(document: PageDocument, store: Arc<MemoryStore>, reply: &str) -> Fixture {
    let backend = CountingBackend::new(reply);
    let sink = Arc::new(RecordingErrorSink::new());
    let bus = MessageBus::new();
    let pipeline = CommentPipeline::new(
        document,
        store.clone(),
        backend.clone(),
        bus.clone(),
        sink.clone(),
    );
    Fixture {
        pipeline,
        store,
        backend,
        sink,
        bus,
    }
}

pub async fn fixture(comments: &[CommentSpec<'_>], reply: &str) -> Fixture {
    fixture_with(page(comments), keyed_store().await, reply)
}
