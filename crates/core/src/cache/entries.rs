//! Persisted cache entries.
//!
//! Raw JSON payloads keyed by entity type, stamped with wall-clock write time
//! so their age survives a restart.

use super::connection::CacheDb;
use crate::Error;
use chrono::Utc;
use std::time::Duration;
use tokio_rusqlite::{params, rusqlite};

/// A persisted payload and its write time in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub key: String,
    pub payload_json: String,
    pub written_at_ms: i64,
}

impl StoredEntry {
    /// Age relative to the current wall clock; future timestamps count as zero.
    pub fn age(&self) -> Duration {
        let elapsed = Utc::now().timestamp_millis() - self.written_at_ms;
        Duration::from_millis(elapsed.max(0) as u64)
    }
}

impl CacheDb {
    /// Get a persisted entry by key.
    ///
    /// Returns None if the key doesn't exist.
    pub async fn get_entry(&self, key: &str) -> Result<Option<StoredEntry>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredEntry>, Error> {
                let mut stmt =
                    conn.prepare("SELECT key, payload_json, written_at_ms FROM cache_entries WHERE key = ?1")?;

                let result = stmt.query_row(params![key], |row| {
                    Ok(StoredEntry { key: row.get(0)?, payload_json: row.get(1)?, written_at_ms: row.get(2)? })
                });

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace the entry for `key`, stamped with the current time.
    pub async fn put_entry(&self, key: &str, payload_json: &str) -> Result<(), Error> {
        self.put_entry_at(key, payload_json, Utc::now().timestamp_millis()).await
    }

    /// Insert or replace the entry for `key` with an explicit write time.
    pub async fn put_entry_at(&self, key: &str, payload_json: &str, written_at_ms: i64) -> Result<(), Error> {
        let key = key.to_string();
        let payload_json = payload_json.to_string();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (key, payload_json, written_at_ms)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        payload_json = excluded.payload_json,
                        written_at_ms = excluded.written_at_ms",
                    params![key, payload_json, written_at_ms],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the entry for `key`. Returns whether a row was removed.
    pub async fn delete_entry(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every persisted entry. Returns the number of deleted rows.
    pub async fn clear_entries(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache_entries", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries written more than `ttl` ago. Returns the number deleted.
    pub async fn purge_expired_entries(&self, ttl: Duration) -> Result<u64, Error> {
        let cutoff = Utc::now().timestamp_millis() - ttl.as_millis() as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE written_at_ms <= ?1", params![cutoff])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("product", r#"[{"id":"1"}]"#).await.unwrap();

        let entry = db.get_entry("product").await.unwrap().unwrap();
        assert_eq!(entry.key, "product");
        assert_eq!(entry.payload_json, r#"[{"id":"1"}]"#);
        assert!(entry.age() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_get_missing_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.get_entry("category").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("category", "[1]").await.unwrap();
        db.put_entry("category", "[2]").await.unwrap();

        let entry = db.get_entry("category").await.unwrap().unwrap();
        assert_eq!(entry.payload_json, "[2]");
    }

    #[tokio::test]
    async fn test_delete_entry_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("collection", "[]").await.unwrap();

        assert!(db.delete_entry("collection").await.unwrap());
        assert!(!db.delete_entry("collection").await.unwrap());
        assert!(db.get_entry("collection").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_expired_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = Utc::now().timestamp_millis();
        db.put_entry_at("product", "[]", now - 600_000).await.unwrap();
        db.put_entry_at("category", "[]", now).await.unwrap();

        let deleted = db.purge_expired_entries(Duration::from_secs(300)).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_entry("product").await.unwrap().is_none());
        assert!(db.get_entry("category").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry("product", "[]").await.unwrap();
        db.put_entry("category", "[]").await.unwrap();

        assert_eq!(db.clear_entries().await.unwrap(), 2);
        assert_eq!(db.clear_entries().await.unwrap(), 0);
    }

    #[test]
    fn test_future_timestamp_has_zero_age() {
        let entry = StoredEntry {
            key: "k".into(),
            payload_json: "[]".into(),
            written_at_ms: Utc::now().timestamp_millis() + 60_000,
        };
        assert_eq!(entry.age(), Duration::ZERO);
    }
}
