use async_trait::async_trait;
use std::time::Duration;

use crate::error::StoreError;

/// The two atomic primitives a lock needs from a shared key-value store.
///
/// Both operations must be atomic on the store side. In particular
/// `conditional_delete` may not be emulated with a read followed by a delete.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Set `key` to `value` with expiry `ttl` only if `key` holds no live value.
    /// Returns whether the set took effect.
    async fn conditional_set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Delete `key` only if it currently holds `expected`.
    /// Returns whether the delete took effect.
    async fn conditional_delete(&self, key: &str, expected: &str) -> Result<bool, StoreError>;
}
