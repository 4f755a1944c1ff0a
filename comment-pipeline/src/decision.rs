/// Minimum combined heuristic and remote score that suppresses a comment.
pub const SUPPRESSION_THRESHOLD: u8 = 3;

pub fn final_score(heuristic: u8, remote: u8) -> u8 {
    heuristic.saturating_add(remote)
}

pub fn should_suppress(heuristic: u8, remote: u8) -> bool {
    final_score(heuristic, remote) >= SUPPRESSION_THRESHOLD
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionReason {
    /// The author is in the session's blocked-account set.
    BlockedAccount,
    Score { heuristic: u8, remote: u8 },
}

/// Outcome of analyzing one comment element. Final for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    NotAComment,
    BelowLikeGate,
    NoSignals,
    Kept { heuristic: u8, remote: u8 },
    Suppressed(SuppressionReason),
    /// Hidden because an enclosing or nested element of the same comment was
    /// suppressed first. Not counted again.
    AlreadySuppressed,
}

impl Verdict {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Verdict::Suppressed(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::NotAComment => "not_a_comment",
            Verdict::BelowLikeGate => "below_like_gate",
            Verdict::NoSignals => "no_signals",
            Verdict::Kept { .. } => "kept",
            Verdict::Suppressed(SuppressionReason::BlockedAccount) => "suppressed_blocked_account",
            Verdict::Suppressed(SuppressionReason::Score { .. }) => "suppressed_score",
            Verdict::AlreadySuppressed => "already_suppressed",
        }
    }
}
