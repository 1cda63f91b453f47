//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the CatalogStore trait.

use crate::state::SyncStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CatalogStore, StorageError, StorageResult};
use crate::storage::{
    AccountStatus, GameRecord, InsertOutcome, NewGame, StoreCounts, SyncRunRecord, SyncRunSummary,
};
use crate::sync::SyncMode;
use crate::title::identity_key;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
///
/// The connection sits behind a mutex so one store can be shared by all
/// entry workers of a batch.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection mutex poisoned".to_string()))
    }
}

fn game_from_row(row: &Row<'_>) -> rusqlite::Result<GameRecord> {
    Ok(GameRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        normalized_title: row.get(2)?,
        description: row.get(3)?,
        price: row.get(4)?,
        cover_url: row.get(5)?,
        source_url: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn sync_run_from_row(row: &Row<'_>) -> rusqlite::Result<SyncRunRecord> {
    let mode: String = row.get(1)?;
    let status: String = row.get(2)?;

    Ok(SyncRunRecord {
        id: row.get(0)?,
        summary: SyncRunSummary {
            mode: SyncMode::from_db_string(&mode).unwrap_or(SyncMode::Full),
            status: SyncStatus::from_db_string(&status).unwrap_or(SyncStatus::Error),
            entries_found: row.get(3)?,
            added: row.get(4)?,
            updated_existing: row.get(5)?,
            credentials_added: row.get(6)?,
            failed: row.get(7)?,
            message: row.get(8)?,
            config_hash: row.get(9)?,
            started_at: row.get(10)?,
            finished_at: row.get(11)?,
        },
    })
}

impl CatalogStore for SqliteStorage {
    // ===== Games =====

    fn find_game_by_normalized_title(&self, normalized: &str) -> StorageResult<Option<GameRecord>> {
        let conn = self.conn()?;
        let game = conn
            .query_row(
                "SELECT id, title, normalized_title, description, price, cover_url, source_url, created_at
                 FROM games WHERE normalized_title = ?1",
                params![normalized],
                game_from_row,
            )
            .optional()?;
        Ok(game)
    }

    fn list_game_titles(&self) -> StorageResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT title FROM games ORDER BY id")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(titles)
    }

    fn list_normalized_titles(&self) -> StorageResult<HashSet<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT normalized_title FROM games")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<HashSet<String>, _>>()?;
        Ok(keys)
    }

    fn insert_game(&self, game: &NewGame) -> StorageResult<InsertOutcome> {
        let key = identity_key(&game.title);
        if key.is_empty() {
            return Err(StorageError::ConstraintViolation(format!(
                "game title {:?} has an empty normalized key",
                game.title
            )));
        }

        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            "INSERT INTO games (title, normalized_title, description, price, cover_url, source_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(normalized_title) DO NOTHING",
            params![
                game.title,
                key,
                game.description,
                game.price,
                game.cover_url,
                game.source_url,
                now
            ],
        )?;

        if changed > 0 {
            return Ok(InsertOutcome::Inserted(conn.last_insert_rowid()));
        }

        let id: i64 = conn.query_row(
            "SELECT id FROM games WHERE normalized_title = ?1",
            params![key],
            |row| row.get(0),
        )?;
        Ok(InsertOutcome::AlreadyExists(id))
    }

    // ===== Accounts =====

    fn list_account_usernames(&self, game_id: i64) -> StorageResult<HashSet<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT username_key FROM accounts WHERE game_id = ?1")?;
        let usernames = stmt
            .query_map(params![game_id], |row| row.get(0))?
            .collect::<Result<HashSet<String>, _>>()?;
        Ok(usernames)
    }

    fn insert_account(
        &self,
        game_id: i64,
        username: &str,
        password: &str,
        status: AccountStatus,
    ) -> StorageResult<InsertOutcome> {
        let conn = self.conn()?;

        let exists: Option<i64> = conn
            .query_row("SELECT id FROM games WHERE id = ?1", params![game_id], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_none() {
            return Err(StorageError::GameNotFound(game_id));
        }

        let key = username.to_lowercase();
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            "INSERT INTO accounts (game_id, username, username_key, password, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(game_id, username_key) DO NOTHING",
            params![game_id, username, key, password, status.to_db_string(), now],
        )?;

        if changed > 0 {
            return Ok(InsertOutcome::Inserted(conn.last_insert_rowid()));
        }

        let id: i64 = conn.query_row(
            "SELECT id FROM accounts WHERE game_id = ?1 AND username_key = ?2",
            params![game_id, key],
            |row| row.get(0),
        )?;
        Ok(InsertOutcome::AlreadyExists(id))
    }

    // ===== Audit =====

    fn record_sync_run(&self, summary: &SyncRunSummary) -> StorageResult<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sync_runs (mode, status, entries_found, added, updated_existing,
                credentials_added, failed, message, config_hash, started_at, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                summary.mode.as_str(),
                summary.status.to_db_string(),
                summary.entries_found,
                summary.added,
                summary.updated_existing,
                summary.credentials_added,
                summary.failed,
                summary.message,
                summary.config_hash,
                summary.started_at,
                summary.finished_at
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list_sync_runs(&self, limit: usize) -> StorageResult<Vec<SyncRunRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, mode, status, entries_found, added, updated_existing, credentials_added,
                    failed, message, config_hash, started_at, finished_at
             FROM sync_runs ORDER BY id DESC LIMIT ?1",
        )?;
        let runs = stmt
            .query_map(params![limit as i64], sync_run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    // ===== Statistics =====

    fn counts(&self) -> StorageResult<StoreCounts> {
        let conn = self.conn()?;
        let count = |sql: &str| -> rusqlite::Result<u64> { conn.query_row(sql, [], |row| row.get(0)) };

        Ok(StoreCounts {
            games: count("SELECT COUNT(*) FROM games")?,
            accounts: count("SELECT COUNT(*) FROM accounts")?,
            incomplete_accounts: count("SELECT COUNT(*) FROM accounts WHERE status = 'incomplete'")?,
            sync_runs: count("SELECT COUNT(*) FROM sync_runs")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(title: &str) -> NewGame {
        NewGame {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_in_memory() {
        assert!(SqliteStorage::new_in_memory().is_ok());
    }

    #[test]
    fn test_insert_game_and_lookup() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let outcome = storage.insert_game(&game("Hollow Knight")).unwrap();
        assert!(outcome.is_inserted());

        let found = storage
            .find_game_by_normalized_title("hollow knight")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, outcome.id());
        assert_eq!(found.title, "Hollow Knight");
    }

    #[test]
    fn test_insert_duplicate_game_reports_existing() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let first = storage.insert_game(&game("Hades")).unwrap();
        let second = storage.insert_game(&game("HADES!")).unwrap();

        assert_eq!(second, InsertOutcome::AlreadyExists(first.id()));
        assert_eq!(storage.list_game_titles().unwrap(), vec!["Hades"]);
    }

    #[test]
    fn test_insert_game_keys_on_normalized_title() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let first = storage.insert_game(&game("Hades Steam G2A Keys")).unwrap();
        let second = storage.insert_game(&game("Hades")).unwrap();

        assert_eq!(second, InsertOutcome::AlreadyExists(first.id()));
        let keys = storage.list_normalized_titles().unwrap();
        assert_eq!(keys, HashSet::from(["hades".to_string()]));
    }

    #[test]
    fn test_insert_game_with_empty_key_fails() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.insert_game(&game("!!")),
            Err(StorageError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn test_accounts_unique_per_game_case_insensitive() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let game_id = storage.insert_game(&game("Hades")).unwrap().id();

        let first = storage
            .insert_account(game_id, "CoolGamer", "pw12345", AccountStatus::Active)
            .unwrap();
        let second = storage
            .insert_account(game_id, "coolgamer", "other99", AccountStatus::Active)
            .unwrap();

        assert!(first.is_inserted());
        assert_eq!(second, InsertOutcome::AlreadyExists(first.id()));

        let usernames = storage.list_account_usernames(game_id).unwrap();
        assert_eq!(usernames.len(), 1);
        assert!(usernames.contains("coolgamer"));
    }

    #[test]
    fn test_same_username_on_different_games() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let a = storage.insert_game(&game("Hades")).unwrap().id();
        let b = storage.insert_game(&game("Celeste")).unwrap().id();

        assert!(storage
            .insert_account(a, "shared1", "pw12345", AccountStatus::Active)
            .unwrap()
            .is_inserted());
        assert!(storage
            .insert_account(b, "shared1", "pw12345", AccountStatus::Active)
            .unwrap()
            .is_inserted());
    }

    #[test]
    fn test_account_for_missing_game() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.insert_account(42, "someone", "pw12345", AccountStatus::Active),
            Err(StorageError::GameNotFound(42))
        ));
    }

    #[test]
    fn test_sync_run_audit_roundtrip() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let summary = SyncRunSummary {
            mode: SyncMode::Fast,
            status: SyncStatus::Concluded,
            entries_found: 12,
            added: 3,
            updated_existing: 1,
            credentials_added: 5,
            failed: 2,
            message: "sync concluded".to_string(),
            config_hash: "abc".to_string(),
            started_at: Utc::now().to_rfc3339(),
            finished_at: Some(Utc::now().to_rfc3339()),
        };
        storage.record_sync_run(&summary).unwrap();
        storage
            .record_sync_run(&SyncRunSummary {
                status: SyncStatus::Error,
                message: "discovery failed".to_string(),
                ..summary.clone()
            })
            .unwrap();

        let runs = storage.list_sync_runs(10).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].summary.status, SyncStatus::Error);
        assert_eq!(runs[1].summary.added, 3);
        assert_eq!(runs[1].summary.mode, SyncMode::Fast);

        assert_eq!(storage.list_sync_runs(1).unwrap().len(), 1);
    }

    #[test]
    fn test_counts() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage.insert_game(&game("Hades")).unwrap().id();
        storage
            .insert_account(id, "gamer1", "pw12345", AccountStatus::Active)
            .unwrap();
        storage
            .insert_account(id, "gamer2", "", AccountStatus::Incomplete)
            .unwrap();

        let counts = storage.counts().unwrap();
        assert_eq!(
            counts,
            StoreCounts {
                games: 1,
                accounts: 2,
                incomplete_accounts: 1,
                sync_runs: 0,
            }
        );
    }

    #[test]
    fn test_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");
        {
            let storage = SqliteStorage::new(&path).unwrap();
            storage.insert_game(&game("Hades")).unwrap();
        }
        let reopened = SqliteStorage::new(&path).unwrap();
        assert_eq!(reopened.list_game_titles().unwrap(), vec!["Hades"]);
    }
}
