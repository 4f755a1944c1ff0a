pub mod decision;
pub mod pipeline;
pub mod session;
pub mod watcher;

#[cfg(test)]
mod tests;

pub use decision::{final_score, should_suppress, SuppressionReason, Verdict, SUPPRESSION_THRESHOLD};
pub use pipeline::{Admission, CommentPipeline, MessageEffect, RescanSummary, StartOutcome};
pub use session::SeenSet;
pub use watcher::ChangeWatcher;
