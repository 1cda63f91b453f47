//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the catalog store.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Games, keyed by normalized title
CREATE TABLE IF NOT EXISTS games (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    normalized_title TEXT NOT NULL UNIQUE,
    description TEXT,
    price REAL,
    cover_url TEXT,
    source_url TEXT,
    created_at TEXT NOT NULL
);

-- Shared accounts per game
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id INTEGER NOT NULL REFERENCES games(id),
    username TEXT NOT NULL,
    username_key TEXT NOT NULL,
    password TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(game_id, username_key)
);

CREATE INDEX IF NOT EXISTS idx_accounts_game ON accounts(game_id);
CREATE INDEX IF NOT EXISTS idx_accounts_status ON accounts(status);

-- Sync run audit trail
CREATE TABLE IF NOT EXISTS sync_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    mode TEXT NOT NULL,
    status TEXT NOT NULL,
    entries_found INTEGER NOT NULL DEFAULT 0,
    added INTEGER NOT NULL DEFAULT 0,
    updated_existing INTEGER NOT NULL DEFAULT 0,
    credentials_added INTEGER NOT NULL DEFAULT 0,
    failed INTEGER NOT NULL DEFAULT 0,
    message TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
