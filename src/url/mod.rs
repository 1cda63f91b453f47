//! URL handling module for Catalog-Sync
//!
//! This module provides URL normalization, domain extraction, and the link
//! classification used by discovery to tell catalog entries apart from
//! category listings and site chrome.

mod domain;
mod normalize;

use crate::config::OriginConfig;
use crate::ConfigError;
use regex::Regex;
use url::Url;

pub use domain::{extract_domain, same_site};
pub use normalize::normalize_url;

/// Classification of a link found on a listing page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// A catalog entry page
    Entry,
    /// A category listing to paginate
    Category,
    /// Same-site link that is neither (tags, pagination, site pages, anchors)
    Excluded,
    /// Off-site link
    External,
}

/// Compiled link rules for one origin
#[derive(Debug, Clone)]
pub struct LinkRules {
    origin: Url,
    category_pattern: Regex,
    excluded_paths: Vec<String>,
    non_catalog_paths: Vec<String>,
}

impl LinkRules {
    /// Compiles the rules from the origin configuration
    pub fn from_config(config: &OriginConfig) -> Result<Self, ConfigError> {
        let origin = Url::parse(&config.root_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid root_url: {}", e)))?;
        let category_pattern = Regex::new(&config.category_pattern)
            .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;

        Ok(Self {
            origin,
            category_pattern,
            excluded_paths: lowercase_all(&config.excluded_paths),
            non_catalog_paths: lowercase_all(&config.non_catalog_paths),
        })
    }

    /// The origin root URL
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Classifies a resolved link
    ///
    /// Category detection runs before the exclusion list because the default
    /// exclusions contain `/category/` themselves.
    pub fn classify(&self, url: &Url) -> LinkKind {
        if !same_site(url, &self.origin) {
            return LinkKind::External;
        }

        let path = url.path().to_lowercase();

        if self.category_pattern.is_match(&path) && !is_paginated_path(&path) {
            return LinkKind::Category;
        }

        // in-page anchors (`#respond`, `#comments`) carry widget text, not titles
        if url.fragment().is_some() {
            return LinkKind::Excluded;
        }

        if self.excluded_paths.iter().any(|p| path.contains(p.as_str())) {
            return LinkKind::Excluded;
        }

        if self.is_non_catalog(url) {
            return LinkKind::Excluded;
        }

        if !has_meaningful_segment(&path) {
            return LinkKind::Excluded;
        }

        LinkKind::Entry
    }

    /// Returns true if the URL points at a known non-catalog site page
    pub fn is_non_catalog(&self, url: &Url) -> bool {
        matches_site_page(url, &self.non_catalog_paths)
    }
}

/// Returns true if the URL path is one of `pages` or lives below one of them
///
/// `pages` are expected lowercase, e.g. `/contact`.
pub fn matches_site_page(url: &Url, pages: &[String]) -> bool {
    let path = url.path().to_lowercase();
    let trimmed = path.trim_end_matches('/');
    pages.iter().any(|p| {
        let page = p.trim_end_matches('/');
        trimmed == page || path.starts_with(&format!("{}/", page))
    })
}

/// Last non-empty path segment, if any
pub fn last_segment(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(|s| s.to_string())
}

fn has_meaningful_segment(path: &str) -> bool {
    path.split('/')
        .filter(|s| !s.is_empty())
        .last()
        .map(|s| s.chars().count() >= 3 && !s.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

fn is_paginated_path(path: &str) -> bool {
    path.contains("/page/")
}

fn lowercase_all(items: &[String]) -> Vec<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}
