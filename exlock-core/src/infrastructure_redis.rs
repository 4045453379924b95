//! Redis-backed CoordinationStore implementation.
//!
//! Acquisition is `SET key token NX PX ttl`; release is a Lua script so the
//! token comparison and the delete execute as one server-side step.
//!
//! Enable with the `redis` feature flag.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;
use std::time::Duration;

use crate::error::StoreError;
use crate::infrastructure::CoordinationStore;

const RELEASE_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#;

pub struct RedisCoordinationStore {
    conn: ConnectionManager,
    release: Script,
}

impl RedisCoordinationStore {
    /// Connect to the server at `url` (e.g. `redis://127.0.0.1/`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::from_connection(conn))
    }

    /// Wrap an existing connection manager.
    pub fn from_connection(conn: ConnectionManager) -> Self {
        Self {
            conn,
            release: Script::new(RELEASE_SCRIPT),
        }
    }
}

#[async_trait]
impl CoordinationStore for RedisCoordinationStore {
    async fn conditional_set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let px = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);

        // Nil reply means the key already exists
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(px)
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn conditional_delete(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = self
            .release
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted == 1)
    }
}
