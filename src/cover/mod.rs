//! Cover image lookup
//!
//! Covers are best effort: a lookup that fails or finds nothing just leaves
//! the game without a cover.

use async_trait::async_trait;

/// Finds a cover image URL for a newly inserted game
#[async_trait]
pub trait CoverLookup: Send + Sync {
    /// Returns a cover URL, or None when nothing was found or the lookup failed
    async fn lookup_cover(&self, title: &str) -> Option<String>;
}

/// Lookup that never finds a cover
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCoverLookup;

#[async_trait]
impl CoverLookup for NoCoverLookup {
    async fn lookup_cover(&self, _title: &str) -> Option<String> {
        None
    }
}
