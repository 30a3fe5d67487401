pub mod users;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::info;

use crate::error::BotError;

/// Thread-safe SQLite key-value store.
///
/// Values are opaque bytes. A key written with a TTL reads as absent once
/// the TTL passes; expired rows are removed lazily on the next read.
#[derive(Clone)]
pub struct KvStore {
    conn: Arc<Mutex<Connection>>,
}

impl KvStore {
    /// Open or create the SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self, BotError> {
        let conn = Connection::open(path)
            .map_err(|e| BotError::Storage(format!("failed to open {}: {}", path.display(), e)))?;

        // Enable WAL mode for better concurrent read performance
        // journal_mode PRAGMA always returns the resulting mode, so use query_row
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

        Self::run_migrations(&conn)?;

        info!("Store opened at: {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, BotError> {
        let conn = Connection::open_in_memory()?;
        Self::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn run_migrations(conn: &Connection) -> Result<(), BotError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key        TEXT PRIMARY KEY,
                value      BLOB NOT NULL,
                expires_at TEXT
            );",
        )?;
        Ok(())
    }

    /// Read a key. Expired entries read as absent and are deleted on the way.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BotError> {
        let conn = self.conn.lock().await;
        let row: Option<(Vec<u8>, Option<String>)> = conn
            .query_row(
                "SELECT value, expires_at FROM kv WHERE key = ?1",
                rusqlite::params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((value, expires_at)) = row else {
            return Ok(None);
        };

        if let Some(expires_at) = expires_at {
            if is_expired(&expires_at) {
                conn.execute("DELETE FROM kv WHERE key = ?1", rusqlite::params![key])?;
                return Ok(None);
            }
        }

        Ok(Some(value))
    }

    /// Write a key, replacing any existing value. `ttl = None` never expires.
    pub async fn put(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<(), BotError> {
        let expires_at = ttl.map(expiry_timestamp);
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, value, expires_at],
        )?;
        Ok(())
    }

    /// Delete a key. Deleting an absent key is not an error.
    pub async fn delete(&self, key: &str) -> Result<(), BotError> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM kv WHERE key = ?1", rusqlite::params![key])?;
        Ok(())
    }

    /// All live entries whose key starts with `prefix`, in key order.
    pub async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, BotError> {
        let now = now_timestamp();
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT key, value FROM kv
             WHERE key LIKE ?1 || '%' AND (expires_at IS NULL OR expires_at > ?2)
             ORDER BY key",
        )?;
        let entries = stmt
            .query_map(rusqlite::params![prefix, now], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

// Timestamps are second-resolution RFC 3339 in UTC, so the stored strings
// compare lexicographically in time order.
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn expiry_timestamp(ttl: Duration) -> String {
    let expires = Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64);
    expires.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn is_expired(expires_at: &str) -> bool {
    match DateTime::parse_from_rfc3339(expires_at) {
        Ok(ts) => ts.with_timezone(&Utc) <= Utc::now(),
        // An unreadable timestamp reads as already expired
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let kv = KvStore::open_in_memory().unwrap();
        kv.put("k1", b"hello", None).await.unwrap();
        assert_eq!(kv.get("k1").await.unwrap(), Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn test_get_absent_key() {
        let kv = KvStore::open_in_memory().unwrap();
        assert_eq!(kv.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_replaces_existing_value() {
        let kv = KvStore::open_in_memory().unwrap();
        kv.put("k1", b"first", None).await.unwrap();
        kv.put("k1", b"second", None).await.unwrap();
        assert_eq!(kv.get("k1").await.unwrap(), Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let kv = KvStore::open_in_memory().unwrap();
        kv.put("k1", b"v", None).await.unwrap();
        kv.delete("k1").await.unwrap();
        kv.delete("k1").await.unwrap();
        assert_eq!(kv.get("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_key_reads_as_absent() {
        let kv = KvStore::open_in_memory().unwrap();
        kv.put("k1", b"stale", Some(Duration::ZERO)).await.unwrap();
        assert_eq!(kv.get("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unexpired_key_survives() {
        let kv = KvStore::open_in_memory().unwrap();
        kv.put("k1", b"fresh", Some(Duration::from_secs(3600)))
            .await
            .unwrap();
        assert_eq!(kv.get("k1").await.unwrap(), Some(b"fresh".to_vec()));
    }

    #[tokio::test]
    async fn test_scan_prefix_filters_and_orders() {
        let kv = KvStore::open_in_memory().unwrap();
        kv.put("user:b", b"2", None).await.unwrap();
        kv.put("user:a", b"1", None).await.unwrap();
        kv.put("catalog:v1", b"x", None).await.unwrap();

        let entries = kv.scan_prefix("user:").await.unwrap();
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["user:a", "user:b"]);
    }

    #[tokio::test]
    async fn test_scan_prefix_skips_expired_entries() {
        let kv = KvStore::open_in_memory().unwrap();
        kv.put("user:stale", b"1", Some(Duration::ZERO)).await.unwrap();
        kv.put("user:live", b"2", None).await.unwrap();

        let entries = kv.scan_prefix("user:").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "user:live");
    }
}
