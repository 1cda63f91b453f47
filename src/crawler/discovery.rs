//! Catalog discovery
//!
//! Walks the origin root and every category it links to, paginating each
//! source, and turns entry links into `CatalogEntry` values. Entries are
//! deduplicated by source URL here; title-based dedup happens in the diff.

use crate::catalog::{CatalogEntry, TitleSource};
use crate::config::{Config, OriginConfig};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::pagination::{page_url, PageOutcome, Paginator, StopReason};
use crate::crawler::parser::{parse_listing, LinkCandidate, ListingPage};
use crate::title::{normalize, TitleFilter};
use crate::url::{last_segment, normalize_url, LinkKind, LinkRules};
use crate::{ConfigError, SyncError};
use scraper::Selector;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Entry and category links found on one listing page
#[derive(Debug, Default)]
struct PageLinks {
    entries: Vec<CatalogEntry>,
    categories: Vec<Url>,
}

/// Discovers catalog entries on the origin
pub struct Crawler {
    fetcher: Arc<Fetcher>,
    rules: LinkRules,
    filter: TitleFilter,
    config: OriginConfig,
    link_selector: Selector,
}

impl Crawler {
    /// Creates a crawler for the configured origin
    pub fn new(config: &Config, fetcher: Arc<Fetcher>) -> Result<Self, ConfigError> {
        let rules = LinkRules::from_config(&config.origin)?;
        let filter = TitleFilter::new(
            &config.titles.extra_denylist,
            &config.origin.non_catalog_paths,
        );
        let link_selector = Selector::parse(&config.origin.entry_link_selector).map_err(|e| {
            ConfigError::Validation(format!("Invalid entry-link-selector: {:?}", e))
        })?;

        Ok(Self {
            fetcher,
            rules,
            filter,
            config: config.origin.clone(),
            link_selector,
        })
    }

    /// Discovers every catalog entry reachable from the root
    ///
    /// # Algorithm
    ///
    /// 1. Fetch the root; collect category links
    /// 2. Paginate the root, then each category, in discovery order
    /// 3. Merge all entries, deduplicated by source URL
    ///
    /// A failed root fetch fails the whole discovery. Failed pages inside a
    /// source count as empty pages.
    pub async fn discover_all(&self) -> Result<Vec<CatalogEntry>, SyncError> {
        let root = self.rules.origin().clone();
        let first = self.fetch_listing(&root).await.ok_or_else(|| {
            SyncError::Discovery(format!("could not fetch origin root {}", root))
        })?;
        let root_links = self.classify_links(&first);

        let categories = unique_urls(root_links.categories.iter().cloned());
        tracing::info!("Found {} categories on {}", categories.len(), root);

        let mut merged = EntrySet::default();

        let found = self.crawl_source(&root, Some(first)).await;
        tracing::info!("Root listing yielded {} entries", found.len());
        merged.extend(found);

        for category in &categories {
            self.page_delay().await;
            let found = self.crawl_source(category, None).await;
            tracing::info!("Category {} yielded {} entries", category, found.len());
            merged.extend(found);
        }

        let entries = merged.into_entries();
        tracing::info!("Discovery finished with {} unique entries", entries.len());
        Ok(entries)
    }

    /// Discovers only the entries on the first page of the root
    pub async fn discover_front_page(&self) -> Result<Vec<CatalogEntry>, SyncError> {
        let root = self.rules.origin().clone();
        let page = self.fetch_listing(&root).await.ok_or_else(|| {
            SyncError::Discovery(format!("could not fetch origin root {}", root))
        })?;

        let mut merged = EntrySet::default();
        merged.extend(self.classify_links(&page).entries);
        Ok(merged.into_entries())
    }

    /// Paginates one listing source
    ///
    /// `first` is page 1 when the caller already fetched it.
    async fn crawl_source(&self, source: &Url, first: Option<ListingPage>) -> Vec<CatalogEntry> {
        let mut paginator = Paginator::new(
            self.config.max_pages_per_source,
            self.config.blind_increment,
        );
        let mut found = EntrySet::default();
        let mut pending_first = first;
        let mut page = 1;

        loop {
            let listing = match pending_first.take() {
                Some(listing) => Some(listing),
                None => {
                    let url = match page_url(source, &self.config.page_path_template, page) {
                        Ok(url) => url,
                        Err(e) => {
                            tracing::warn!("Cannot build page {} of {}: {}", page, source, e);
                            break;
                        }
                    };
                    self.fetch_listing(&url).await
                }
            };

            let (entries_found, signals) = match listing {
                Some(listing) => {
                    let links = self.classify_links(&listing);
                    let count = links.entries.len();
                    found.extend(links.entries);
                    (count, listing.pagination)
                }
                None => (0, Default::default()),
            };

            tracing::debug!("{} page {}: {} entries", source, page, entries_found);

            let outcome = PageOutcome {
                page,
                entries_found,
                signals,
            };

            match paginator.advance(&outcome) {
                Ok(next) => page = next,
                Err(reason) => {
                    match reason {
                        StopReason::PageCap => {
                            tracing::warn!("Stopped {} at the page cap ({})", source, page)
                        }
                        StopReason::ConsecutiveEmpty => {
                            tracing::debug!("Stopped {} after two empty pages", source)
                        }
                        StopReason::NoContinuation => {
                            tracing::debug!("No further pages for {}", source)
                        }
                    }
                    break;
                }
            }

            self.page_delay().await;
        }

        found.into_entries()
    }

    /// Fetches and parses a listing page; None on fetch failure
    async fn fetch_listing(&self, url: &Url) -> Option<ListingPage> {
        match self.fetcher.fetch(url.as_str()).await {
            Ok(fetched) => {
                let base = fetched.base_url().unwrap_or_else(|| url.clone());
                Some(parse_listing(&fetched.body, &base, &self.link_selector))
            }
            Err(e) => {
                tracing::warn!("Listing page skipped: {}", e);
                None
            }
        }
    }

    fn classify_links(&self, listing: &ListingPage) -> PageLinks {
        let mut links = PageLinks::default();

        for candidate in &listing.links {
            // classified before normalization strips the fragment
            let kind = self.rules.classify(&candidate.url);
            let Ok(url) = normalize_url(candidate.url.as_str()) else {
                continue;
            };

            match kind {
                LinkKind::Category => links.categories.push(url),
                LinkKind::Entry => {
                    if let Some(entry) = self.entry_from_link(candidate, &url) {
                        links.entries.push(entry);
                    }
                }
                LinkKind::Excluded | LinkKind::External => {}
            }
        }

        links
    }

    fn entry_from_link(&self, candidate: &LinkCandidate, url: &Url) -> Option<CatalogEntry> {
        let (raw, source) = resolve_title(candidate, url)?;
        let title = normalize(&raw);

        if self.filter.should_exclude(&title, Some(url)) {
            tracing::trace!("Excluded listing {:?} at {}", title, url);
            return None;
        }

        Some(CatalogEntry::new(title, url.as_str(), source))
    }

    async fn page_delay(&self) {
        if self.config.page_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.page_delay_ms)).await;
        }
    }
}

/// Resolves a candidate title: link text, then URL slug, then attributes
fn resolve_title(candidate: &LinkCandidate, url: &Url) -> Option<(String, TitleSource)> {
    if !candidate.text.is_empty() {
        return Some((candidate.text.clone(), TitleSource::LinkText));
    }

    if let Some(slug) = last_segment(url).map(|s| title_case_slug(&s)) {
        if !slug.is_empty() {
            return Some((slug, TitleSource::UrlSlug));
        }
    }

    candidate
        .title_attr
        .clone()
        .or_else(|| candidate.image_alt.clone())
        .map(|t| (t, TitleSource::Attribute))
}

/// `hollow-knight` → `Hollow Knight`
fn title_case_slug(slug: &str) -> String {
    slug.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn unique_urls(urls: impl Iterator<Item = Url>) -> Vec<Url> {
    let mut seen = HashSet::new();
    urls.filter(|u| seen.insert(u.as_str().to_string())).collect()
}

/// Entries keyed by source URL, in first-seen order
#[derive(Debug, Default)]
struct EntrySet {
    entries: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
}

impl EntrySet {
    fn extend(&mut self, entries: impl IntoIterator<Item = CatalogEntry>) {
        for entry in entries {
            self.insert(entry);
        }
    }

    /// Adds an entry; an existing entry keeps its place but takes the better title
    fn insert(&mut self, entry: CatalogEntry) {
        match self.index.get(&entry.source_url) {
            Some(&i) => {
                let existing = &mut self.entries[i];
                if entry.title_source < existing.title_source {
                    existing.title = entry.title;
                    existing.title_source = entry.title_source;
                }
            }
            None => {
                self.index.insert(entry.source_url.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    fn into_entries(self) -> Vec<CatalogEntry> {
        self.entries
    }
}
