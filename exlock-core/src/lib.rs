//! # exlock-core
//!
//! Distributed mutual exclusion for async Rust. A critical section runs on at
//! most one process at a time, coordinated through a shared key-value store
//! that offers atomic conditional set and conditional delete. Lock keys are
//! derived from call arguments with a small `#{…}` template language.
//!
//! ```no_run
//! use exlock_core::{DistributedLock, InMemoryCoordinationStore, LockError};
//! use serde_json::json;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<(), LockError> {
//! let lock = DistributedLock::new(Arc::new(InMemoryCoordinationStore::new()));
//!
//! let request = lock
//!     .request("order:create:#{0}", &[json!("user-42")])
//!     .with_wait_timeout(Duration::from_secs(3));
//! assert_eq!(request.key, "lock:order:create:user-42");
//!
//! let total = lock.run_exclusive(&request, || async { 1 + 1 }).await?;
//! assert_eq!(total, 2);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod infrastructure;
#[path = "infrastructure_in_memory.rs"]
pub mod infrastructure_in_memory;
#[cfg(feature = "redis")]
#[path = "infrastructure_redis.rs"]
pub mod infrastructure_redis;
#[cfg(feature = "sqlite")]
#[path = "infrastructure_sqlite.rs"]
pub mod infrastructure_sqlite;
pub mod lock;
pub mod resolver;
pub mod types;

pub use config::LockOptions;
pub use error::{LockError, StoreError};
pub use infrastructure::CoordinationStore;
pub use infrastructure_in_memory::InMemoryCoordinationStore;
#[cfg(feature = "redis")]
pub use infrastructure_redis::RedisCoordinationStore;
#[cfg(feature = "sqlite")]
pub use infrastructure_sqlite::SqliteCoordinationStore;
pub use lock::{DistributedLock, LockGuard, ReleaseOutcome};
pub use resolver::{KeyResolver, LOCK_NAMESPACE, namespaced};
pub use types::{LockClaim, LockRequest};

#[cfg(test)]
mod config_test;
#[cfg(test)]
mod resolver_test;
