#[cfg(test)]
mod tests {
    use crate::decision::{final_score, should_suppress, SuppressionReason, Verdict};
    use crate::session::SeenSet;
    use cleaner_core::CommentId;
    use comment_extractor::PageDocument;

    #[test]
    fn test_threshold() {
        assert!(!should_suppress(0, 2));
        assert!(!should_suppress(1, 1));
        assert!(should_suppress(2, 1));
        assert!(should_suppress(5, 10));
        assert_eq!(final_score(5, 10), 15);
        assert_eq!(final_score(u8::MAX, 1), u8::MAX);
    }

    #[test]
    fn test_verdict_labels() {
        assert!(Verdict::Suppressed(SuppressionReason::BlockedAccount).is_suppressed());
        assert!(!Verdict::Kept {
            heuristic: 1,
            remote: 1
        }
        .is_suppressed());
        assert!(!Verdict::AlreadySuppressed.is_suppressed());
        assert_eq!(Verdict::BelowLikeGate.as_str(), "below_like_gate");
        assert_eq!(Verdict::AlreadySuppressed.as_str(), "already_suppressed");
    }

    #[test]
    fn test_seen_set_admits_once() {
        let document = PageDocument::parse(
            "https://www.youtube.com/",
            "<html><body><ytd-comment-renderer></ytd-comment-renderer><ytd-comment-renderer></ytd-comment-renderer></body></html>",
        );
        let nodes = document.comment_candidates();
        assert_eq!(nodes.len(), 2);

        let mut seen = SeenSet::new();
        let first = seen.admit(nodes[0]).unwrap();
        let second = seen.admit(nodes[1]).unwrap();
        assert_eq!(first, CommentId(0));
        assert_eq!(second, CommentId(1));
        assert_eq!(seen.admit(nodes[0]), None);

        assert!(seen.contains(nodes[1]));
        assert_eq!(seen.node_of(second), Some(nodes[1]));
        assert_eq!(seen.id_of(nodes[0]), Some(first));
        assert_eq!(seen.pending(), 2);

        seen.settle(first, Verdict::NoSignals);
        assert_eq!(seen.verdict(first), Some(Verdict::NoSignals));
        assert_eq!(seen.verdict(second), None);
        assert_eq!(seen.pending(), 1);
        assert_eq!(seen.len(), 2);
    }
}
