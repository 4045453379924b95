use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::StoreError;
use crate::infrastructure::CoordinationStore;

/// Stand-in expiry for TTLs past what `Instant` can represent (about 30 years).
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Process-local coordination store.
///
/// Only coordinates tasks sharing one instance. Expiry runs on the tokio clock,
/// so paused test time drives TTLs.
pub struct InMemoryCoordinationStore {
    // Map of key -> claim
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryCoordinationStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The live value stored at `key`, if any.
    pub async fn current_value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    /// Number of live claims.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop expired claims. Returns how many were removed.
    pub async fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }
}

impl Default for InMemoryCoordinationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoordinationStore for InMemoryCoordinationStore {
    async fn conditional_set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        if entries.get(key).is_some_and(|entry| entry.is_live(now)) {
            return Ok(false);
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now
                    .checked_add(ttl)
                    .unwrap_or_else(|| now + FAR_FUTURE),
            },
        );
        Ok(true)
    }

    async fn conditional_delete(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        let (live, owned) = match entries.get(key) {
            Some(entry) => (entry.is_live(now), entry.value == expected),
            None => return Ok(false),
        };

        if !live {
            entries.remove(key);
            return Ok(false);
        }
        if owned {
            entries.remove(key);
        }
        Ok(owned)
    }
}
