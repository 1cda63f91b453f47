//! Crawler module for catalog discovery
//!
//! This module contains the origin-facing side of the pipeline:
//! - HTTP fetching with retry logic
//! - Listing and entry page parsing
//! - The pagination rule for listing sources
//! - Discovery of catalog entries across the root and its categories

mod discovery;
mod fetcher;
mod pagination;
mod parser;

pub use discovery::Crawler;
pub use fetcher::{build_http_client, FetchError, FetchedPage, Fetcher};
pub use pagination::{page_url, PageOutcome, Paginator, StopReason};
pub use parser::{
    page_number, parse_listing, parse_page_meta, LinkCandidate, ListingPage, PageMeta,
    PaginationSignals,
};
