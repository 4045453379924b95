//! SQLite-backed CoordinationStore implementation.
//! Every process opening the same database file shares one set of claims,
//! which gives real cross-process exclusion on a single host.
//!
//! Enable with the `sqlite` feature flag:
//! ```toml
//! exlock-core = { path = "../exlock-core", features = ["sqlite"] }
//! ```

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::StoreError;
use crate::infrastructure::CoordinationStore;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

fn ttl_ms(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}

/// A coordination store backed by a SQLite database file.
///
/// Expiry uses wall-clock milliseconds so that separate processes agree on it.
/// Statements run on the blocking thread pool.
pub struct SqliteCoordinationStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCoordinationStore {
    /// Open (or create) a SQLite database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        // Concurrent processes contend on the write lock; wait instead of failing
        conn.busy_timeout(Duration::from_secs(5))?;
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS claims (
                key         TEXT PRIMARY KEY,
                token       TEXT NOT NULL,
                expires_at  INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_claims_expires ON claims(expires_at);",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("sqlite connection mutex poisoned".into()))?;
            f(&conn).map_err(StoreError::from)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Delete expired claims. Returns how many rows were removed.
    pub async fn evict_expired(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM claims WHERE expires_at <= ?1", params![now_ms()])
        })
        .await
    }

    /// The live token stored at `key`, if any.
    pub async fn current_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT token FROM claims WHERE key = ?1 AND expires_at > ?2",
                params![key, now_ms()],
                |row| row.get::<_, String>(0),
            )
            .optional()
        })
        .await
    }
}

#[async_trait]
impl CoordinationStore for SqliteCoordinationStore {
    async fn conditional_set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let key = key.to_string();
        let value = value.to_string();
        let ttl = ttl_ms(ttl);

        // Insert, or take over a row whose claim has lapsed, in one statement
        let changed = self
            .with_conn(move |conn| {
                let now = now_ms();
                conn.execute(
                    "INSERT INTO claims (key, token, expires_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE
                         SET token = excluded.token, expires_at = excluded.expires_at
                     WHERE claims.expires_at <= ?4",
                    params![key, value, now.saturating_add(ttl), now],
                )
            })
            .await?;
        Ok(changed > 0)
    }

    async fn conditional_delete(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let key = key.to_string();
        let expected = expected.to_string();

        let deleted = self
            .with_conn(move |conn| {
                conn.execute(
                    "DELETE FROM claims WHERE key = ?1 AND token = ?2 AND expires_at > ?3",
                    params![key, expected, now_ms()],
                )
            })
            .await?;
        Ok(deleted > 0)
    }
}
