//! Catalog entries and the store diff
//!
//! A `CatalogEntry` is one listing discovered on the origin. Its identity is
//! the normalized title key, not the URL: the origin exposes the same game
//! under several URLs.

use crate::title::identity_key;
use std::collections::HashSet;

/// Where an entry's title came from, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TitleSource {
    /// Visible link text
    LinkText,
    /// Last URL path segment, hyphens turned into spaces
    UrlSlug,
    /// A `title` attribute or image `alt` text
    Attribute,
}

/// A catalog entry discovered on the origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Normalized title
    pub title: String,
    /// Listing URL the entry was found at
    pub source_url: String,
    /// `<title>` of the entry page, once fetched
    pub raw_page_title: Option<String>,
    /// First heading of the entry page, once fetched
    pub raw_heading: Option<String>,
    /// Where `title` was resolved from
    pub title_source: TitleSource,
}

impl CatalogEntry {
    pub fn new(title: impl Into<String>, source_url: impl Into<String>, source: TitleSource) -> Self {
        Self {
            title: title.into(),
            source_url: source_url.into(),
            raw_page_title: None,
            raw_heading: None,
            title_source: source,
        }
    }

    /// Identity key used for deduplication and the store diff
    pub fn key(&self) -> String {
        identity_key(&self.title)
    }
}

/// Collapses entries that share a title key, keeping the first occurrence
pub fn dedup_by_title(entries: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| {
            let key = entry.key();
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}

/// Entries whose title key is absent from the store, deduplicated by title
///
/// `membership` holds the stored normalized title keys.
pub fn missing_entries(
    discovered: Vec<CatalogEntry>,
    membership: &HashSet<String>,
) -> Vec<CatalogEntry> {
    dedup_by_title(discovered)
        .into_iter()
        .filter(|entry| !membership.contains(&entry.key()))
        .collect()
}
