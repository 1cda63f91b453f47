use crate::title::normalize::title_key;
use crate::url::matches_site_page;
use std::collections::HashSet;
use url::Url;

/// Titles of listings that are never games
const DENYLIST: &[&str] = &[
    "home",
    "contact",
    "contact us",
    "about",
    "about us",
    "privacy policy",
    "terms of service",
    "terms and conditions",
    "dmca",
    "faq",
    "read more",
    "leia mais",
    "next",
    "previous",
    "older posts",
    "newer posts",
    "login",
    "register",
    "search",
    "uncategorized",
    "all games",
    "request a game",
    "how to use",
    "giveaway",
];

/// Decides which discovered listings are not catalog entries
#[derive(Debug, Clone)]
pub struct TitleFilter {
    denylist: HashSet<String>,
    non_catalog_paths: Vec<String>,
}

impl TitleFilter {
    /// Creates a filter from the built-in denylist plus configured additions
    pub fn new(extra_denylist: &[String], non_catalog_paths: &[String]) -> Self {
        let denylist = DENYLIST
            .iter()
            .map(|t| title_key(t))
            .chain(extra_denylist.iter().map(|t| title_key(t)))
            .filter(|k| !k.is_empty())
            .collect();

        Self {
            denylist,
            non_catalog_paths: non_catalog_paths.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Returns true if the listing must not become a catalog entry
    ///
    /// Rejects titles whose key is empty or purely numeric (pagination
    /// labels), titles on the denylist, and listings whose source is a known
    /// site page.
    pub fn should_exclude(&self, title: &str, source_url: Option<&Url>) -> bool {
        let key = title_key(title);

        if key.is_empty() || key.chars().all(|c| c.is_numeric() || c == ' ') {
            return true;
        }

        if self.denylist.contains(&key) {
            return true;
        }

        source_url
            .map(|url| matches_site_page(url, &self.non_catalog_paths))
            .unwrap_or(false)
    }
}

impl Default for TitleFilter {
    fn default() -> Self {
        Self::new(&[], &[])
    }
}
