//! Storage traits and error types
//!
//! This module defines the trait interface the sync pipeline consumes and
//! the associated error types.

use crate::storage::{
    AccountStatus, GameRecord, InsertOutcome, NewGame, StoreCounts, SyncRunRecord, SyncRunSummary,
};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Game not found: {0}")]
    GameNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence interface of the catalog store
///
/// Implementations are shared between concurrent entry workers, so every
/// method takes `&self`. Uniqueness of `(normalized_title)` and
/// `(game_id, username)` is enforced by the store itself; inserts report
/// conflicts through [`InsertOutcome`] rather than an error.
pub trait CatalogStore: Send + Sync {
    // ===== Games =====

    /// Looks a game up by its normalized title key
    fn find_game_by_normalized_title(&self, normalized: &str) -> StorageResult<Option<GameRecord>>;

    /// Titles of every stored game
    fn list_game_titles(&self) -> StorageResult<Vec<String>>;

    /// Normalized title keys of every stored game, as lookups see them
    fn list_normalized_titles(&self) -> StorageResult<HashSet<String>>;

    /// Inserts a game unless one with the same normalized title exists
    ///
    /// The key is [`identity_key`](crate::title::identity_key) of the title.
    fn insert_game(&self, game: &NewGame) -> StorageResult<InsertOutcome>;

    // ===== Accounts =====

    /// Lowercased usernames already stored for a game
    fn list_account_usernames(&self, game_id: i64) -> StorageResult<HashSet<String>>;

    /// Inserts an account unless `(game_id, username)` exists (case-insensitive)
    fn insert_account(
        &self,
        game_id: i64,
        username: &str,
        password: &str,
        status: AccountStatus,
    ) -> StorageResult<InsertOutcome>;

    // ===== Audit =====

    /// Persists a sync run summary, returning its id
    fn record_sync_run(&self, summary: &SyncRunSummary) -> StorageResult<i64>;

    /// Most recent audit rows, newest first
    fn list_sync_runs(&self, limit: usize) -> StorageResult<Vec<SyncRunRecord>>;

    // ===== Statistics =====

    fn counts(&self) -> StorageResult<StoreCounts>;
}
