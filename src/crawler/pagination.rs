//! Pagination policy for listing sources
//!
//! The origin's pagination markup is inconsistent, so the next page is chosen
//! by one deterministic rule:
//!
//! 1. an explicit numbered link beyond the current page → continue
//! 2. otherwise a "next" link → continue
//! 3. otherwise, if blind increment is enabled and the page yielded entries → continue
//! 4. otherwise stop
//!
//! Pages are always visited sequentially (current + 1). Two empty pages in a
//! row and the per-source page cap stop the walk regardless of signals.

use crate::crawler::parser::PaginationSignals;
use url::Url;

/// Result of crawling one listing page
#[derive(Debug, Clone, Default)]
pub struct PageOutcome {
    pub page: u32,
    pub entries_found: usize,
    pub signals: PaginationSignals,
}

/// Why pagination of a source stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    NoContinuation,
    ConsecutiveEmpty,
    PageCap,
}

/// Tracks the walk over one source's pages
#[derive(Debug, Clone)]
pub struct Paginator {
    max_pages: u32,
    blind_increment: bool,
    consecutive_empty: u32,
}

impl Paginator {
    pub fn new(max_pages: u32, blind_increment: bool) -> Self {
        Self {
            max_pages: max_pages.max(1),
            blind_increment,
            consecutive_empty: 0,
        }
    }

    /// Decides the page to visit after `outcome`
    pub fn advance(&mut self, outcome: &PageOutcome) -> Result<u32, StopReason> {
        if outcome.entries_found == 0 {
            self.consecutive_empty += 1;
        } else {
            self.consecutive_empty = 0;
        }

        if self.consecutive_empty >= 2 {
            return Err(StopReason::ConsecutiveEmpty);
        }

        if outcome.page >= self.max_pages {
            return Err(StopReason::PageCap);
        }

        let next = outcome.page + 1;
        let signals = &outcome.signals;

        if signals.max_numbered.map(|n| n > outcome.page).unwrap_or(false) {
            return Ok(next);
        }

        if signals.has_next {
            return Ok(next);
        }

        if self.blind_increment && outcome.entries_found > 0 {
            return Ok(next);
        }

        Err(StopReason::NoContinuation)
    }
}

/// Builds the URL of page `n` of a listing source
///
/// Page 1 is the bare source URL. Templates starting with `?` replace the
/// query string; anything else is joined below the source path.
///
/// # Examples
///
/// ```
/// use catalog_sync::crawler::page_url;
/// use url::Url;
///
/// let source = Url::parse("https://origin.example/category/rpg").unwrap();
/// assert_eq!(
///     page_url(&source, "page/{n}/", 3).unwrap().as_str(),
///     "https://origin.example/category/rpg/page/3/"
/// );
/// ```
pub fn page_url(source: &Url, template: &str, n: u32) -> Result<Url, url::ParseError> {
    if n <= 1 {
        return Ok(source.clone());
    }

    let relative = template.replace("{n}", &n.to_string());
    if relative.starts_with('?') {
        return source.join(&relative);
    }

    let mut base = source.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.set_query(None);
    base.join(relative.trim_start_matches('/'))
}
