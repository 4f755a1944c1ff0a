use crate::channel_id::extract_account_id;
use crate::dom::{compile_selectors, parent_element, query_first, text_of, PageDocument};
use crate::like_count::parse_like_count;
use cleaner_core::{CommentId, CommentRecord, ExtractionError};
use ego_tree::NodeId;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Minimum trimmed comment length, in characters.
pub const MIN_TEXT_CHARS: usize = 10;

/// Resolved weight the comment renderer uses for emphasized text.
pub const EMPHASIS_FONT_WEIGHT: u16 = 500;

const NORMAL_FONT_WEIGHT: u16 = 400;

const TEXT_SELECTORS: &[&str] = &[
    "#content-text",
    ".ytd-comment-renderer #content-text",
    ".ytd-comment-thread-renderer #content-text",
    r#"span[dir="auto"]"#,
    ".style-scope.ytd-comment-renderer",
];

const AUTHOR_SELECTORS: &[&str] = &[
    "#author-text span",
    "#author-text a",
    "a#author-text",
    ".ytd-comment-renderer #author-text",
    ".ytd-comment-thread-renderer #author-text",
];

const AUTHOR_LINK_SELECTOR: &str = "#author-text a, a#author-text";

const LIKE_SELECTORS: &[&str] = &[
    "#vote-count-middle",
    "#vote-count-left",
    ".vote-count",
    ".style-scope.ytd-comment-renderer #vote-count-middle",
    "ytd-comment-renderer #vote-count-middle",
    "ytd-comment-thread-renderer #vote-count-middle",
    r#"[aria-label*="좋아요"]"#,
    r#"[aria-label*="like"]"#,
    "ytd-toggle-button-renderer #text",
    "ytd-toggle-button-renderer .style-scope.ytd-toggle-button-renderer",
];

static TEXT: LazyLock<Vec<Selector>> = LazyLock::new(|| compile_selectors(TEXT_SELECTORS));
static AUTHOR: LazyLock<Vec<Selector>> = LazyLock::new(|| compile_selectors(AUTHOR_SELECTORS));
static AUTHOR_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(AUTHOR_LINK_SELECTOR).expect("static selector must parse"));
static LIKES: LazyLock<Vec<Selector>> = LazyLock::new(|| compile_selectors(LIKE_SELECTORS));

/// Builds a [`CommentRecord`] for the element `node`, or reports why it is not a comment.
///
/// The result depends only on the document fragment around `node`.
pub fn extract_comment(
    document: &PageDocument,
    node: NodeId,
    source: CommentId,
) -> Result<CommentRecord, ExtractionError> {
    let element = document
        .element(node)
        .ok_or_else(|| ExtractionError::ElementMissing {
            node: format!("{:?}", node),
        })?;

    let (text_element, text) = find_text(&element)?;
    let length = text.chars().count();
    if length < MIN_TEXT_CHARS {
        return Err(ExtractionError::TextTooShort { length });
    }

    let username = AUTHOR
        .iter()
        .find_map(|selector| query_first(&element, selector))
        .map(|author| text_of(&author))
        .unwrap_or_default();

    let account_id = query_first(&element, &AUTHOR_LINK)
        .and_then(|link| link.value().attr("href").map(extract_account_id))
        .unwrap_or_default();

    let record = CommentRecord {
        text,
        username,
        like_count: extract_like_count(&element),
        account_id,
        emphasized: resolved_font_weight(&text_element) == EMPHASIS_FONT_WEIGHT,
        source,
    };

    trace!(
        %source,
        username = %record.username,
        likes = record.like_count,
        account_id = %record.account_id,
        "Extracted comment"
    );
    Ok(record)
}

fn find_text<'a>(element: &ElementRef<'a>) -> Result<(ElementRef<'a>, String), ExtractionError> {
    for selector in TEXT.iter() {
        if let Some(found) = query_first(element, selector) {
            let text = text_of(&found);
            if !text.is_empty() {
                return Ok((found, text));
            }
        }
    }

    let own = text_of(element);
    if own.chars().count() > MIN_TEXT_CHARS {
        return Ok((*element, own));
    }
    Err(ExtractionError::NoText)
}

/// Like count from the comment's subtree, falling back to its parent's subtree.
///
/// The first matching element whose text parses to a positive count wins.
pub fn extract_like_count(element: &ElementRef<'_>) -> u64 {
    if let Some(likes) = first_positive_count(element) {
        return likes;
    }

    if let Some(parent) = parent_element(element) {
        if let Some(likes) = first_positive_count(&parent) {
            debug!(likes, "Like count found in parent element");
            return likes;
        }
    }

    trace!("Like count not found");
    0
}

fn first_positive_count(scope: &ElementRef<'_>) -> Option<u64> {
    LIKES.iter().find_map(|selector| {
        let found = query_first(scope, selector)?;
        let likes = parse_like_count(&text_of(&found));
        (likes > 0).then_some(likes)
    })
}

/// Font weight in effect for `element`, taken from the nearest inline `font-weight`
/// declaration on it or an ancestor. Relative weights are skipped.
pub fn resolved_font_weight(element: &ElementRef<'_>) -> u16 {
    let mut current = Some(*element);
    while let Some(el) = current {
        if let Some(weight) = el.value().attr("style").and_then(declared_font_weight) {
            return weight;
        }
        current = parent_element(&el);
    }
    NORMAL_FONT_WEIGHT
}

fn declared_font_weight(style: &str) -> Option<u16> {
    style
        .split(';')
        .filter_map(|declaration| declaration.split_once(':'))
        .filter(|(property, _)| property.trim().eq_ignore_ascii_case("font-weight"))
        .filter_map(|(_, value)| {
            let value = value.trim().trim_end_matches("!important").trim();
            match value.to_ascii_lowercase().as_str() {
                "normal" => Some(NORMAL_FONT_WEIGHT),
                "bold" => Some(700),
                other => other.parse::<u16>().ok().filter(|w| (1..=1000).contains(w)),
            }
        })
        .last()
}
