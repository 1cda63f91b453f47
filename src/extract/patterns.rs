//! Credential label patterns
//!
//! All patterns run against either visible text or serialized markup, so the
//! gap between a label, its colon, and its value may contain tags.

use regex::Regex;
use std::sync::LazyLock;

const USER_LABEL: &str = r"(?:user(?:name)?|usu[aá]rio|login)";
const PASS_LABEL: &str = r"(?:pass(?:word)?|senha)";

/// Whitespace and tags between a label, its colon, and its value
const GAP: &str = r"(?:\s|<[^>]*>)*";

/// Whitespace, tags, and light punctuation between a username and the PASS label
const PAIR_GAP: &str = r"(?:\s|<[^>]*>|[|/,;])*";

const VALUE: &str = r"[^\s<>]+";

#[allow(clippy::expect_used)]
static COMBINED_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b{user}{gap}[:：]{gap}(?P<user>{value}){pair_gap}\b{pass}{gap}[:：]{gap}(?P<pass>{value})",
        user = USER_LABEL,
        pass = PASS_LABEL,
        gap = GAP,
        pair_gap = PAIR_GAP,
        value = VALUE,
    ))
    .expect("hardcoded regex pattern is valid")
});

#[allow(clippy::expect_used)]
static USER_VALUE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b{}{gap}[:：]{gap}({})",
        USER_LABEL,
        VALUE,
        gap = GAP
    ))
    .expect("hardcoded regex pattern is valid")
});

#[allow(clippy::expect_used)]
static PASS_VALUE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b{}{gap}[:：]{gap}({})",
        PASS_LABEL,
        VALUE,
        gap = GAP
    ))
    .expect("hardcoded regex pattern is valid")
});

/// Undoes the entity escapes the page builder leaves in markup
pub fn prepare(markup: &str) -> String {
    markup
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&amp;", "&")
}

/// `(username, password)` captures of the combined `USER ... PASS ...` pattern
pub fn combined_pairs(haystack: &str) -> Vec<(String, String)> {
    COMBINED_REGEX
        .captures_iter(haystack)
        .filter_map(|caps| {
            let user = caps.name("user")?.as_str();
            let pass = caps.name("pass")?.as_str();
            Some((user.to_string(), pass.to_string()))
        })
        .collect()
}

/// Values following a USER label, in document order
pub fn user_values(haystack: &str) -> Vec<String> {
    captures(&USER_VALUE_REGEX, haystack)
}

/// Values following a PASS label, in document order
pub fn pass_values(haystack: &str) -> Vec<String> {
    captures(&PASS_VALUE_REGEX, haystack)
}

/// Returns true if the text carries both a USER and a PASS label
pub fn has_both_labels(haystack: &str) -> bool {
    USER_VALUE_REGEX.is_match(haystack) && PASS_VALUE_REGEX.is_match(haystack)
}

fn captures(regex: &Regex, haystack: &str) -> Vec<String> {
    regex
        .captures_iter(haystack)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
