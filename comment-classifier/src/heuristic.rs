//! Cheap pre-filter run before any remote call.

use cleaner_core::CommentRecord;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Records below this many likes are never scored.
pub const LIKE_GATE: u64 = 200;
pub const HIGH_LIKE_THRESHOLD: u64 = 300;
pub const MIN_UNDERSCORES: usize = 2;

static CHANNEL_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)채널|channel|체널|체날|채날").expect("valid regex"));

static DISGUISED_NINETEEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[IiLl]9|[IiLl]_9").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    EmphasizedText,
    HighLikeCount,
    ChannelWordInName,
    DisguisedNineteen,
    ManyUnderscores,
}

impl Signal {
    pub const ALL: [Signal; 5] = [
        Signal::EmphasizedText,
        Signal::HighLikeCount,
        Signal::ChannelWordInName,
        Signal::DisguisedNineteen,
        Signal::ManyUnderscores,
    ];

    pub fn matches(&self, record: &CommentRecord) -> bool {
        match self {
            Signal::EmphasizedText => record.emphasized,
            Signal::HighLikeCount => record.like_count >= HIGH_LIKE_THRESHOLD,
            Signal::ChannelWordInName => CHANNEL_WORD.is_match(&record.username),
            Signal::DisguisedNineteen => DISGUISED_NINETEEN.is_match(&record.username),
            Signal::ManyUnderscores => {
                record.username.matches('_').count() >= MIN_UNDERSCORES
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::EmphasizedText => "emphasized_text",
            Signal::HighLikeCount => "high_like_count",
            Signal::ChannelWordInName => "channel_word_in_name",
            Signal::DisguisedNineteen => "disguised_nineteen",
            Signal::ManyUnderscores => "many_underscores",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sum of triggered signals, each worth one point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeuristicScore {
    pub total: u8,
    pub signals: Vec<Signal>,
}

impl HeuristicScore {
    pub fn is_zero(&self) -> bool {
        self.total == 0
    }
}

pub fn passes_like_gate(record: &CommentRecord) -> bool {
    record.like_count >= LIKE_GATE
}

pub fn score_heuristics(record: &CommentRecord) -> HeuristicScore {
    let signals: Vec<Signal> = Signal::ALL
        .into_iter()
        .filter(|signal| signal.matches(record))
        .collect();

    HeuristicScore {
        total: signals.len() as u8,
        signals,
    }
}
