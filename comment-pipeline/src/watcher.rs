use crate::decision::Verdict;
use crate::pipeline::{CommentPipeline, MessageEffect};
use cleaner_core::Message;
use comment_extractor::MutationBatch;
use futures::future::LocalBoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace, warn};

/// Debounces document mutations into rescans and applies bus messages.
///
/// The first mutation batch that adds a comment container arms a deadline one
/// debounce window away; later batches fold into that rescan. While the pipeline
/// is disabled, batches are ignored and a pending rescan is dropped.
///
/// A rescan only admits new comments. Their analyses are polled alongside
/// mutations and messages, so a slow remote call never holds up the next rescan.
pub struct ChangeWatcher<'a> {
    pipeline: &'a CommentPipeline,
    debounce: Duration,
    mutations: mpsc::UnboundedReceiver<MutationBatch>,
    messages: broadcast::Receiver<Message>,
    deadline: Option<Instant>,
    in_flight: FuturesUnordered<LocalBoxFuture<'a, Verdict>>,
}

impl<'a> ChangeWatcher<'a> {
    /// Subscribes to the pipeline's document and to `messages` exactly once.
    pub fn attach(
        pipeline: &'a CommentPipeline,
        messages: broadcast::Receiver<Message>,
        debounce: Duration,
    ) -> Self {
        let mutations = pipeline.document_mut().subscribe();
        Self {
            pipeline,
            debounce,
            mutations,
            messages,
            deadline: None,
            in_flight: FuturesUnordered::new(),
        }
    }

    /// Runs an initial rescan, then watches until `shutdown` resolves.
    ///
    /// Analyses still in flight at shutdown are dropped.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        info!(debounce_ms = self.debounce.as_millis() as u64, "Watching for comments");
        self.start_rescan();

        let mut messages_open = true;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                batch = self.mutations.recv() => match batch {
                    Some(batch) => self.on_batch(&batch),
                    None => {
                        debug!("Document closed, watcher stopping");
                        break;
                    }
                },
                message = self.messages.recv(), if messages_open => match message {
                    Ok(message) => self.on_message(&message),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Watcher lagged behind the message bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => messages_open = false,
                },
                Some(verdict) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    trace!(
                        verdict = verdict.as_str(),
                        in_flight = self.in_flight.len(),
                        "Analysis finished"
                    );
                }
                _ = wait_for(self.deadline) => self.start_rescan(),
            }
        }

        if !self.in_flight.is_empty() {
            debug!(dropped = self.in_flight.len(), "Watcher stopped with analyses in flight");
        }
    }

    fn start_rescan(&mut self) {
        self.deadline = None;
        let pipeline = self.pipeline;
        let admission = pipeline.admit_new();
        for (node, id) in admission.comments {
            self.in_flight.push(pipeline.analyze(node, id).boxed_local());
        }
    }

    fn on_batch(&mut self, batch: &MutationBatch) {
        if !self.pipeline.is_enabled() {
            return;
        }
        if !self.pipeline.document().batch_has_comments(batch) {
            return;
        }
        if self.deadline.is_none() {
            debug!(added = batch.added.len(), "New comments detected, rescan scheduled");
            self.deadline = Some(Instant::now() + self.debounce);
        }
    }

    fn on_message(&mut self, message: &Message) {
        match self.pipeline.handle_message(message) {
            MessageEffect::RescanNow => self.start_rescan(),
            MessageEffect::CancelPending => self.deadline = None,
            MessageEffect::None => {}
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
