//! Key/value cache with per-entry expiry
//!
//! Used for the update flags (`last_updated`, `update_running`) and for
//! upstream response bodies. Keys are namespaced with a configurable prefix.
//! `add` is atomic, which is what makes the update flag a lock across
//! processes sharing the SQLite backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store `value`, replacing any existing entry. `None` never expires.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()>;

    /// Store `value` only if no live entry exists. Returns whether it was stored.
    async fn add(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<bool>;

    /// Remove an entry. Returns whether a live entry was removed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Remove every entry under this cache's prefix
    async fn clear(&self) -> CacheResult<()>;

    /// Drop expired entries from the backing store. Returns how many went.
    async fn purge_expired(&self) -> CacheResult<u64>;
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn expiry_millis(ttl: Option<Duration>) -> Option<i64> {
    ttl.map(|ttl| {
        let ttl = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        now_millis().saturating_add(ttl)
    })
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<i64>,
}

impl MemoryEntry {
    fn is_live(&self, now: i64) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Process-local cache
#[derive(Debug, Clone)]
pub struct MemoryCache {
    prefix: String,
    entries: Arc<Mutex<HashMap<String, MemoryEntry>>>,
}

impl MemoryCache {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let entries = self.entries.lock().await;
        let now = now_millis();
        Ok(entries
            .get(&self.full_key(key))
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            self.full_key(key),
            MemoryEntry {
                value: value.to_string(),
                expires_at: expiry_millis(ttl),
            },
        );
        Ok(())
    }

    async fn add(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<bool> {
        let mut entries = self.entries.lock().await;
        let full_key = self.full_key(key);
        let now = now_millis();
        if entries.get(&full_key).is_some_and(|entry| entry.is_live(now)) {
            return Ok(false);
        }
        entries.insert(
            full_key,
            MemoryEntry {
                value: value.to_string(),
                expires_at: expiry_millis(ttl),
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut entries = self.entries.lock().await;
        let now = now_millis();
        Ok(entries
            .remove(&self.full_key(key))
            .is_some_and(|entry| entry.is_live(now)))
    }

    async fn clear(&self) -> CacheResult<()> {
        let mut entries = self.entries.lock().await;
        entries.retain(|key, _| !key.starts_with(&self.prefix));
        Ok(())
    }

    async fn purge_expired(&self) -> CacheResult<u64> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        let now = now_millis();
        entries.retain(|_, entry| entry.is_live(now));
        Ok((before - entries.len()) as u64)
    }
}

/// Cache stored in the `cache_entries` table of the application database
#[derive(Debug, Clone)]
pub struct SqliteCache {
    pool: SqlitePool,
    prefix: String,
}

impl SqliteCache {
    pub fn new(pool: SqlitePool, prefix: impl Into<String>) -> Self {
        Self {
            pool,
            prefix: prefix.into(),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl Cache for SqliteCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar(
            "SELECT value FROM cache_entries \
             WHERE key = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(self.full_key(key))
        .bind(now_millis())
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        sqlx::query(
            "INSERT INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
        )
        .bind(self.full_key(key))
        .bind(value)
        .bind(expiry_millis(ttl))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn add(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<bool> {
        // An expired entry may be overwritten; a live one may not
        let result = sqlx::query(
            "INSERT INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at \
             WHERE cache_entries.expires_at IS NOT NULL AND cache_entries.expires_at <= ?",
        )
        .bind(self.full_key(key))
        .bind(value)
        .bind(expiry_millis(ttl))
        .bind(now_millis())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let result = sqlx::query(
            "DELETE FROM cache_entries \
             WHERE key = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(self.full_key(key))
        .bind(now_millis())
        .execute(&self.pool)
        .await?;
        // Drop the key even if it had already expired
        sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(self.full_key(key))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> CacheResult<()> {
        sqlx::query("DELETE FROM cache_entries WHERE substr(key, 1, length(?1)) = ?1")
            .bind(&self.prefix)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Expired rows are invisible but stay on disk until purged
    async fn purge_expired(&self) -> CacheResult<u64> {
        let result = sqlx::query(
            "DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at <= ?",
        )
        .bind(now_millis())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
