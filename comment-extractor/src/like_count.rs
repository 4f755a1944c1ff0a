use regex::Regex;
use std::sync::LazyLock;

static RE_PLAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)$").expect("valid regex"));
static RE_GROUPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{1,3}(?:,[0-9]{3})*)$").expect("valid regex"));
static RE_SUFFIXED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+(?:\.[0-9]+)?)(k|m|천|만)$").expect("valid regex"));

/// Parses a rendered like counter such as `"1,234"`, `"1.2K"`, `"2M"`, `"1천"` or `"1.5만"`.
///
/// Anything unrecognised, including an empty string, is 0.
pub fn parse_like_count(raw: &str) -> u64 {
    let text = raw.trim().to_lowercase();
    if text.is_empty() {
        return 0;
    }

    if let Some(caps) = RE_PLAIN.captures(&text) {
        return caps[1].parse().unwrap_or(0);
    }

    if let Some(caps) = RE_GROUPED.captures(&text) {
        return caps[1].replace(',', "").parse().unwrap_or(0);
    }

    if let Some(caps) = RE_SUFFIXED.captures(&text) {
        let value: f64 = match caps[1].parse() {
            Ok(v) => v,
            Err(_) => return 0,
        };
        let multiplier = match &caps[2] {
            "k" | "천" => 1_000.0,
            "m" => 1_000_000.0,
            "만" => 10_000.0,
            _ => return 0,
        };
        return (value * multiplier).floor() as u64;
    }

    0
}
