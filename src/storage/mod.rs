//! Storage module for the catalog store
//!
//! This module handles all database operations the sync pipeline needs:
//! - SQLite database initialization and schema management
//! - Insert-if-absent for games and accounts, with typed conflict outcomes
//! - Lookup by normalized title
//! - The sync run audit trail

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{CatalogStore, StorageError, StorageResult};

use crate::state::SyncStatus;
use crate::sync::SyncMode;

use std::path::Path;

/// Opens (or creates) the SQLite store at `path`
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Outcome of an insert-if-absent
///
/// A unique-constraint hit is not an error: it means another writer (or an
/// earlier run) already stored the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written with this id
    Inserted(i64),
    /// A row with the same key already existed; this is its id
    AlreadyExists(i64),
}

impl InsertOutcome {
    pub fn id(&self) -> i64 {
        match self {
            Self::Inserted(id) | Self::AlreadyExists(id) => *id,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// A stored game
#[derive(Debug, Clone)]
pub struct GameRecord {
    pub id: i64,
    pub title: String,
    pub normalized_title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub cover_url: Option<String>,
    pub source_url: Option<String>,
    pub created_at: String,
}

/// A game to insert
#[derive(Debug, Clone, Default)]
pub struct NewGame {
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub cover_url: Option<String>,
    pub source_url: Option<String>,
}

/// Status of a stored account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    /// Complete username/password pair
    Active,
    /// Username without a password, kept for manual follow-up
    Incomplete,
}

impl AccountStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Incomplete => "incomplete",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "incomplete" => Some(Self::Incomplete),
            _ => None,
        }
    }
}

/// Audit row for one sync run
#[derive(Debug, Clone)]
pub struct SyncRunSummary {
    pub mode: SyncMode,
    pub status: SyncStatus,
    pub entries_found: u64,
    pub added: u64,
    pub updated_existing: u64,
    pub credentials_added: u64,
    pub failed: u64,
    pub message: String,
    pub config_hash: String,
    pub started_at: String,
    pub finished_at: Option<String>,
}

/// A stored audit row
#[derive(Debug, Clone)]
pub struct SyncRunRecord {
    pub id: i64,
    pub summary: SyncRunSummary,
}

/// Row counts for reporting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub games: u64,
    pub accounts: u64,
    pub incomplete_accounts: u64,
    pub sync_runs: u64,
}
