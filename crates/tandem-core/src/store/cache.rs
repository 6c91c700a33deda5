//! Key/value cache with per-entry expiration
//!
//! The cache is the foundation the other durable records sit beside: task
//! lists and small bits of sync bookkeeping (last drain timestamp) are stored
//! as JSON values under string keys, optionally with a time-to-live.

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::error::Result;

/// Repository over the `cache_entries` table
pub struct CacheStore<'a> {
    conn: &'a Connection,
}

impl<'a> CacheStore<'a> {
    /// Create a cache store over the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Store a value under `key`, replacing any previous entry.
    ///
    /// With a `ttl`, the entry expires and reads as absent after it elapses.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        let json = serde_json::to_string(value)?;
        let expires_at = ttl.map(|ttl| {
            chrono::Utc::now().timestamp_millis() + i64::try_from(ttl.as_millis()).unwrap_or(0)
        });
        self.conn.execute(
            "INSERT INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
            params![key, json, expires_at],
        )?;
        Ok(())
    }

    /// Read a value, treating expired or unparseable entries as absent.
    ///
    /// An entry that no longer parses is removed and logged rather than
    /// propagated, so one corrupt record cannot wedge startup.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let row: Option<(String, Option<i64>)> = self
            .conn
            .query_row(
                "SELECT value, expires_at FROM cache_entries WHERE key = ?",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((json, expires_at)) = row else {
            return Ok(None);
        };

        let now = chrono::Utc::now().timestamp_millis();
        if expires_at.is_some_and(|at| at <= now) {
            self.remove(key)?;
            return Ok(None);
        }

        match serde_json::from_str(&json) {
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                tracing::warn!("Dropping unparseable cache entry '{key}': {error}");
                self.remove(key)?;
                Ok(None)
            }
        }
    }

    /// Remove an entry; removing an absent key is a no-op.
    pub fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM cache_entries WHERE key = ?", params![key])?;
        Ok(())
    }

    /// Delete all expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let now = chrono::Utc::now().timestamp_millis();
        let removed = self.conn.execute(
            "DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at <= ?",
            params![now],
        )?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_get_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let cache = CacheStore::new(store.connection());

        cache.set("greeting", &"hello".to_string(), None).unwrap();
        let value: Option<String> = cache.get("greeting").unwrap();
        assert_eq!(value, Some("hello".to_string()));
    }

    #[test]
    fn test_missing_key_reads_as_none() {
        let store = Store::open_in_memory().unwrap();
        let cache = CacheStore::new(store.connection());

        let value: Option<String> = cache.get("absent").unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_expired_entry_reads_as_none() {
        let store = Store::open_in_memory().unwrap();
        let cache = CacheStore::new(store.connection());

        cache
            .set("ephemeral", &42_i64, Some(Duration::ZERO))
            .unwrap();
        let value: Option<i64> = cache.get("ephemeral").unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_unparseable_entry_is_dropped_not_fatal() {
        let store = Store::open_in_memory().unwrap();
        store
            .connection()
            .execute(
                "INSERT INTO cache_entries (key, value, expires_at) VALUES ('bad', 'not json{', NULL)",
                [],
            )
            .unwrap();

        let cache = CacheStore::new(store.connection());
        let value: Option<i64> = cache.get("bad").unwrap();
        assert_eq!(value, None);

        // The corrupt row was removed.
        let count: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_purge_expired_leaves_live_entries() {
        let store = Store::open_in_memory().unwrap();
        let cache = CacheStore::new(store.connection());

        cache.set("old", &1_i64, Some(Duration::ZERO)).unwrap();
        cache
            .set("live", &2_i64, Some(Duration::from_secs(3600)))
            .unwrap();
        cache.set("forever", &3_i64, None).unwrap();

        assert_eq!(cache.purge_expired().unwrap(), 1);
        assert_eq!(cache.get::<i64>("live").unwrap(), Some(2));
        assert_eq!(cache.get::<i64>("forever").unwrap(), Some(3));
    }
}
