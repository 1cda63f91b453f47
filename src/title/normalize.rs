use regex::Regex;
use std::sync::LazyLock;

/// Generic marketing phrases removed wherever they appear (whole phrase, any case)
///
/// Longer phrases come first so "Free Steam Accounts" is not left as "Free".
const MARKETING_PHRASES: &[&str] = &[
    "Free Steam Accounts",
    "Free Steam Account",
    "Contas Steam Gratis",
    "Conta Steam Gratis",
    "Shared Steam Accounts",
    "Shared Steam Account",
    "Steam Accounts",
    "Steam Account",
    "Steam Keys",
    "Steam Key",
    "Free Accounts",
    "Free Account",
    "Full Version",
    "Free Download",
];

/// Where a marketplace token may be stripped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenPlacement {
    /// Removed wherever it appears as a whole word
    Anywhere,
    /// Removed only when it ends the title
    TrailingOnly,
}

/// Fixed per-token policy table for marketplace and platform tokens
const TOKEN_POLICY: &[(&str, TokenPlacement)] = &[
    ("G2A", TokenPlacement::Anywhere),
    ("Kinguin", TokenPlacement::Anywhere),
    ("Nuuvem", TokenPlacement::TrailingOnly),
    ("Eneba", TokenPlacement::TrailingOnly),
    ("Steam", TokenPlacement::TrailingOnly),
    ("PC", TokenPlacement::TrailingOnly),
];

/// Characters trimmed from both ends after phrase removal
const SEPARATORS: &[char] = &['-', '–', '—', '|', ':', '•', '·', '►', '»', ','];

#[allow(clippy::expect_used)]
static PHRASE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives = MARKETING_PHRASES
        .iter()
        .map(|p| regex::escape(p).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives)).expect("hardcoded regex pattern is valid")
});

#[allow(clippy::expect_used)]
static ANYWHERE_TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives = tokens_with(TokenPlacement::Anywhere);
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives)).expect("hardcoded regex pattern is valid")
});

#[allow(clippy::expect_used)]
static TRAILING_TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives = tokens_with(TokenPlacement::TrailingOnly);
    Regex::new(&format!(r"(?i)[\s\-–—|:•·►»,]*\b(?:{})\s*$", alternatives))
        .expect("hardcoded regex pattern is valid")
});

#[allow(clippy::expect_used)]
static EMPTY_BRACKETS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*\)|\[\s*\]|\{\s*\}").expect("hardcoded regex pattern is valid")
});

#[allow(clippy::expect_used)]
static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("hardcoded regex pattern is valid"));

fn tokens_with(placement: TokenPlacement) -> String {
    TOKEN_POLICY
        .iter()
        .filter(|(_, p)| *p == placement)
        .map(|(token, _)| regex::escape(token))
        .collect::<Vec<_>>()
        .join("|")
}

/// Canonicalizes a noisy listing title
///
/// Strips marketing phrases and marketplace tokens, trims separator
/// characters, and collapses whitespace. Never produces an empty title: a
/// removal that would leave less than two characters is not applied, so a
/// title made only of marketing text comes back untouched. The result is a
/// fixed point: `normalize(normalize(x)) == normalize(x)`.
///
/// # Examples
///
/// ```
/// use catalog_sync::title::normalize;
///
/// assert_eq!(normalize("Hades – Free Steam Accounts"), "Hades");
/// assert_eq!(normalize("Hitman 3 Full Version G2A"), "Hitman 3");
/// ```
pub fn normalize(raw: &str) -> String {
    // One removal can expose another ("Hades Steam G2A Keys" loses G2A, then
    // "Steam Keys"), so passes repeat until the title stops changing.
    let mut title = raw.to_string();
    loop {
        let next = normalize_pass(&title);
        if next == title || next.chars().count() < 2 {
            break;
        }
        title = next;
    }

    title
}

fn normalize_pass(title: &str) -> String {
    let title = PHRASE_REGEX.replace_all(title, " ");
    let title = ANYWHERE_TOKEN_REGEX.replace_all(&title, " ");
    let title = EMPTY_BRACKETS_REGEX.replace_all(&title, " ");
    let title = trim_separators(&collapse_whitespace(&title));

    let stripped = TRAILING_TOKEN_REGEX.replace(&title, "");
    trim_separators(&stripped)
}

/// Collapses runs of whitespace into single spaces and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text, " ").trim().to_string()
}

fn trim_separators(text: &str) -> String {
    text.trim_matches(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
        .to_string()
}

/// Identity key for a title: lowercase, punctuation removed, whitespace collapsed
///
/// Two listings with the same key are the same catalog entry.
///
/// # Examples
///
/// ```
/// use catalog_sync::title::title_key;
///
/// assert_eq!(title_key("  Half-Life:  Alyx "), "halflife alyx");
/// assert_eq!(title_key("HALF-LIFE ALYX!"), "halflife alyx");
/// ```
pub fn title_key(title: &str) -> String {
    let stripped: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect();
    collapse_whitespace(&stripped)
}

/// Key a game is stored and looked up under: the key of the normalized title
pub fn identity_key(title: &str) -> String {
    title_key(&normalize(title))
}
