//! Local durable store for Tandem
//!
//! Three independent records live here: the task cache (key/value entries
//! with per-entry expiration), the pending action queue, and the optimistic
//! update ledger. Each loads independently at startup; a corrupt row in one
//! never prevents loading the others.

mod cache;
mod ledger;
mod queue;
mod service;

pub use cache::CacheStore;
pub use ledger::{SqliteUpdateLedger, UpdateLedger};
pub use queue::{ActionQueue, SqliteActionQueue};
pub use service::StoreService;

use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cache_entries (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    expires_at INTEGER
);

CREATE TABLE IF NOT EXISTS pending_actions (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    id          TEXT NOT NULL UNIQUE,
    payload     TEXT NOT NULL,
    timestamp   INTEGER NOT NULL,
    retry_count INTEGER NOT NULL DEFAULT 0,
    max_retries INTEGER NOT NULL DEFAULT 3
);

CREATE TABLE IF NOT EXISTS optimistic_updates (
    id              TEXT PRIMARY KEY,
    task_id         TEXT NOT NULL UNIQUE,
    original_task   TEXT,
    optimistic_task TEXT,
    timestamp       INTEGER NOT NULL,
    action          TEXT NOT NULL
);
";

/// Connection wrapper owning the local `SQLite` database
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the store at the given path and ensure the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory store (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        // WAL may be unsupported on some filesystems; best effort.
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        let _ = conn.pragma_update(None, "synchronous", "NORMAL");
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}
