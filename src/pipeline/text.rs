//! Slugs, category detection and summary cleanup

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

use crate::core::models::CategoryRule;

const SLUG_BASE_LEN: usize = 60;
const SLUG_HASH_LEN: usize = 6;

fn non_slug_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"))
}

fn html_tags() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid regex"))
}

/// URL-safe slug from the English title, suffixed with a hash of the source URL
pub fn make_slug(title: &str, url: &str) -> String {
    let lowered = title.to_lowercase();
    let replaced = non_slug_chars().replace_all(&lowered, "-");
    // only [a-z0-9-] is left, so byte slicing is safe
    let trimmed = replaced.trim_matches('-');
    let base = trimmed[..trimmed.len().min(SLUG_BASE_LEN)].trim_end_matches('-');

    let digest = format!("{:x}", Sha256::digest(url.as_bytes()));
    let hash = &digest[..SLUG_HASH_LEN];

    if base.is_empty() {
        hash.to_string()
    } else {
        format!("{}-{}", base, hash)
    }
}

/// First rule with a keyword found in the title or summary
pub fn detect_category<'a>(title: &str, summary: &str, rules: &'a [CategoryRule]) -> Option<&'a str> {
    let text = format!("{} {}", title, summary).to_lowercase();
    rules
        .iter()
        .find(|rule| rule.keywords.iter().any(|kw| text.contains(kw.as_str())))
        .map(|rule| rule.slug.as_str())
}

/// Remove tags and decode the handful of entities feeds commonly leave behind
pub fn strip_html(input: &str) -> String {
    let without_tags = html_tags().replace_all(input, "");
    without_tags
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#8217;", "\u{2019}")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Truncate to at most `max` characters
pub fn truncate_chars(input: &str, max: usize) -> String {
    match input.char_indices().nth(max) {
        Some((idx, _)) => input[..idx].to_string(),
        None => input.to_string(),
    }
}
