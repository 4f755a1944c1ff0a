pub mod cache;
pub mod gemini;
pub mod heuristic;
pub mod remote;


pub use cache::ClassificationCache;
pub use gemini::{is_quota_error, GeminiClient, GEMINI_API_URL, GEMINI_MODEL};
pub use heuristic::{
    passes_like_gate, score_heuristics, HeuristicScore, Signal, HIGH_LIKE_THRESHOLD, LIKE_GATE,
};
pub use remote::{build_prompt, parse_score, RemoteClassifier, ScoringBackend};
