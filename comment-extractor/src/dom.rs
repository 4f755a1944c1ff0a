use cleaner_core::ExtractionError;
use ego_tree::{NodeId, NodeRef, Tree};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Patterns identifying a comment-bearing element, in rescan query order.
pub const COMMENT_CONTAINER_SELECTORS: &[&str] = &[
    "ytd-comment-thread-renderer",
    "ytd-comment-renderer",
    "#content-text",
];

pub(crate) static COMMENT_CONTAINERS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| compile_selectors(COMMENT_CONTAINER_SELECTORS));

pub(crate) fn compile_selectors(patterns: &[&str]) -> Vec<Selector> {
    patterns
        .iter()
        .map(|pattern| Selector::parse(pattern).expect("static selector must parse"))
        .collect()
}

/// Elements inserted by one mutation, child-list changes only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationBatch {
    pub added: Vec<NodeId>,
}

/// A live page: an arena of parsed nodes that can grow, plus per-element hidden flags.
///
/// Node ids are arena indices and stay valid for the life of the document. Insertions
/// are announced to every subscriber as a [`MutationBatch`]; the document never removes
/// nodes, it only marks them hidden.
pub struct PageDocument {
    url: String,
    html: Html,
    hidden: HashSet<NodeId>,
    subscribers: Vec<mpsc::UnboundedSender<MutationBatch>>,
}

impl PageDocument {
    pub fn parse(url: impl Into<String>, source: &str) -> Self {
        Self {
            url: url.into(),
            html: Html::parse_document(source),
            hidden: HashSet::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn empty(url: impl Into<String>) -> Self {
        Self::parse(url, "<html><head></head><body></body></html>")
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<MutationBatch> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.html.tree.get(id).and_then(ElementRef::wrap)
    }

    pub fn body(&self) -> Option<NodeId> {
        static BODY: LazyLock<Selector> =
            LazyLock::new(|| Selector::parse("body").expect("static selector must parse"));
        self.html.select(&BODY).next().map(|el| el.id())
    }

    /// Ids of all elements matching `selector`, in document order.
    pub fn select_ids(&self, selector: &Selector) -> Vec<NodeId> {
        self.html.select(selector).map(|el| el.id()).collect()
    }

    pub fn find_first(&self, selector: &str) -> Result<Option<NodeId>, ExtractionError> {
        let selector = Selector::parse(selector).map_err(|_| ExtractionError::InvalidSelector {
            selector: selector.to_string(),
        })?;
        Ok(self.html.select(&selector).next().map(|el| el.id()))
    }

    /// Comment containers in rescan order: every match of the first pattern, then the
    /// second, and so on. An element matching several patterns appears once per pattern.
    pub fn comment_candidates(&self) -> Vec<NodeId> {
        COMMENT_CONTAINERS
            .iter()
            .flat_map(|selector| self.select_ids(selector))
            .collect()
    }

    /// Parses `fragment` and appends its top-level nodes under `parent`.
    pub fn append_html(
        &mut self,
        parent: NodeId,
        fragment: &str,
    ) -> Result<Vec<NodeId>, ExtractionError> {
        if self.element(parent).is_none() {
            return Err(ExtractionError::ElementMissing {
                node: format!("{:?}", parent),
            });
        }

        let parsed = Html::parse_fragment(fragment);
        let added = graft(&mut self.html.tree, parent, *parsed.root_element());

        debug!(count = added.len(), "Appended fragment nodes");
        self.notify(MutationBatch {
            added: added.clone(),
        });
        Ok(added)
    }

    /// Appends under the first element matching `parent_selector`.
    pub fn append_to(
        &mut self,
        parent_selector: &str,
        fragment: &str,
    ) -> Result<Vec<NodeId>, ExtractionError> {
        let parent = self
            .find_first(parent_selector)?
            .ok_or_else(|| ExtractionError::ElementMissing {
                node: parent_selector.to_string(),
            })?;
        self.append_html(parent, fragment)
    }

    /// True when an added node is itself a comment container or contains one.
    pub fn batch_has_comments(&self, batch: &MutationBatch) -> bool {
        batch.added.iter().any(|id| match self.element(*id) {
            Some(element) => is_comment_element(&element) || has_comment_children(&element),
            None => false,
        })
    }

    pub fn hide(&mut self, id: NodeId) -> bool {
        self.hidden.insert(id)
    }

    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.hidden.contains(&id)
    }

    /// Hidden directly or through a hidden ancestor.
    pub fn is_displayed(&self, id: NodeId) -> bool {
        match self.html.tree.get(id) {
            Some(node) => {
                !self.hidden.contains(&id) && !node.ancestors().any(|a| self.hidden.contains(&a.id()))
            }
            None => false,
        }
    }

    /// True when `id`, an ancestor or a descendant is hidden.
    pub fn overlaps_hidden(&self, id: NodeId) -> bool {
        match self.html.tree.get(id) {
            Some(node) => {
                !self.is_displayed(id)
                    || node.descendants().any(|d| self.hidden.contains(&d.id()))
            }
            None => false,
        }
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden.len()
    }

    /// Clears every hidden flag, returning how many elements became visible again.
    pub fn reveal_all(&mut self) -> usize {
        let revealed = self.hidden.len();
        self.hidden.clear();
        revealed
    }

    fn notify(&mut self, batch: MutationBatch) {
        if batch.added.is_empty() {
            return;
        }
        self.subscribers.retain(|tx| tx.send(batch.clone()).is_ok());
        trace!(subscribers = self.subscribers.len(), "Delivered mutation batch");
    }
}

pub fn is_comment_element(element: &ElementRef<'_>) -> bool {
    COMMENT_CONTAINERS
        .iter()
        .any(|selector| selector.matches(element))
}

pub fn has_comment_children(element: &ElementRef<'_>) -> bool {
    COMMENT_CONTAINERS
        .iter()
        .any(|selector| query_first(element, selector).is_some())
}

/// First strict descendant of `element` matching `selector`.
pub fn query_first<'a>(element: &ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    let own_id = element.id();
    element.select(selector).find(|found| found.id() != own_id)
}

pub fn parent_element<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    element.parent().and_then(ElementRef::wrap)
}

pub fn text_of(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn graft(tree: &mut Tree<Node>, parent: NodeId, source: NodeRef<'_, Node>) -> Vec<NodeId> {
    let mut added = Vec::new();
    for child in source.children() {
        let new_id = match tree.get_mut(parent) {
            Some(mut parent_node) => parent_node.append(child.value().clone()).id(),
            None => break,
        };
        graft(tree, new_id, child);
        added.push(new_id);
    }
    added
}
