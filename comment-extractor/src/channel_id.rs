use regex::Regex;
use std::sync::LazyLock;
use url::Url;

const SITE_BASE: &str = "https://www.youtube.com/";

static RE_CANONICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/channel/(UC[a-zA-Z0-9_-]+)").expect("valid regex"));
static RE_HANDLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(?:c/|@)([^/]+)").expect("valid regex"));

/// Account id from an author link: the canonical `UC...` channel id when present,
/// otherwise the handle or custom path. Empty when neither pattern matches.
///
/// Canonical ids and handles share one key space, so the same author reached through
/// different link shapes yields different ids.
pub fn extract_account_id(href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }

    // Only the path takes part in matching; query and fragment are dropped.
    let path = Url::parse(SITE_BASE)
        .and_then(|base| base.join(href))
        .map(|resolved| resolved.path().to_string())
        .unwrap_or_else(|_| href.to_string());

    if let Some(caps) = RE_CANONICAL.captures(&path) {
        return caps[1].to_string();
    }

    if let Some(caps) = RE_HANDLE.captures(&path) {
        return caps[1].to_string();
    }

    String::new()
}
