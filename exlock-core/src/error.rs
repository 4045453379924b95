use std::time::Duration;
use thiserror::Error;

/// Failure talking to a coordination store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("coordination store unavailable: {0}")]
    Unavailable(String),

    #[error("blocking store task failed: {0}")]
    Task(String),

    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Why a lock could not be acquired.
///
/// Errors raised by the protected operation never appear here; they reach the
/// caller untouched.
#[derive(Debug, Error)]
pub enum LockError {
    /// The key stayed held for the whole wait timeout.
    #[error("lock busy: {key} ({message})")]
    Busy {
        key: String,
        waited: Duration,
        message: String,
    },

    /// The store failed while acquiring. Not retried.
    #[error("coordination store unavailable while acquiring {key}: {source}")]
    StoreUnavailable {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("invalid lock request: {0}")]
    InvalidRequest(String),
}

impl LockError {
    pub fn is_busy(&self) -> bool {
        matches!(self, LockError::Busy { .. })
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            LockError::Busy { key, .. } | LockError::StoreUnavailable { key, .. } => Some(key),
            LockError::InvalidRequest(_) => None,
        }
    }
}
