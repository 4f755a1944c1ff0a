use crate::decision::Verdict;
use cleaner_core::CommentId;
use comment_extractor::NodeId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct SeenEntry {
    node: NodeId,
    verdict: Option<Verdict>,
}

/// Arena of every comment element discovered this session.
///
/// `CommentId(n)` indexes entry `n`. An element is admitted at most once; the
/// verdict slot stays empty while its analysis is in flight.
#[derive(Debug, Default)]
pub struct SeenSet {
    entries: Vec<SeenEntry>,
    by_node: HashMap<NodeId, CommentId>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a fresh id to `node`, or `None` if it was admitted before.
    pub fn admit(&mut self, node: NodeId) -> Option<CommentId> {
        if self.by_node.contains_key(&node) {
            return None;
        }
        let id = CommentId(self.entries.len() as u64);
        self.entries.push(SeenEntry {
            node,
            verdict: None,
        });
        self.by_node.insert(node, id);
        Some(id)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.by_node.contains_key(&node)
    }

    pub fn id_of(&self, node: NodeId) -> Option<CommentId> {
        self.by_node.get(&node).copied()
    }

    pub fn node_of(&self, id: CommentId) -> Option<NodeId> {
        self.entries.get(id.0 as usize).map(|entry| entry.node)
    }

    pub fn settle(&mut self, id: CommentId, verdict: Verdict) {
        if let Some(entry) = self.entries.get_mut(id.0 as usize) {
            entry.verdict = Some(verdict);
        }
    }

    pub fn verdict(&self, id: CommentId) -> Option<Verdict> {
        self.entries.get(id.0 as usize).and_then(|entry| entry.verdict)
    }

    pub fn pending(&self) -> usize {
        self.entries.iter().filter(|e| e.verdict.is_none()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
