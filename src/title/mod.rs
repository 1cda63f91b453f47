//! Title normalizer
//!
//! Listing titles on the origin carry marketing noise ("Free Steam Accounts",
//! reseller suffixes) and site chrome shows up as listings too. This module
//! cleans titles, derives the identity key used for deduplication, and
//! filters out listings that are not games.

mod filter;
mod normalize;

pub use filter::TitleFilter;
pub use normalize::{collapse_whitespace, identity_key, normalize, title_key};
