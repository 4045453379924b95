use std::time::Duration;

use crate::config::LockOptions;
use crate::error::LockError;

/// A single request to run under a lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRequest {
    /// Fully-qualified coordination key
    pub key: String,
    /// How long the store keeps the claim before expiring it unilaterally
    pub ttl: Duration,
    /// How long to keep polling for the claim (zero = a single attempt)
    pub wait_timeout: Duration,
    /// Spacing between acquisition attempts
    pub retry_interval: Duration,
    /// Message carried by [`LockError::Busy`]
    pub busy_message: String,
}

impl LockRequest {
    /// Request for an already-resolved key, with default tunables.
    pub fn new(key: impl Into<String>) -> Self {
        Self::from_options(key, &LockOptions::default())
    }

    pub fn from_options(key: impl Into<String>, options: &LockOptions) -> Self {
        Self {
            key: key.into(),
            ttl: options.ttl(),
            wait_timeout: options.wait_timeout(),
            retry_interval: options.retry_interval(),
            busy_message: options.busy_message.clone(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    pub fn with_busy_message(mut self, message: impl Into<String>) -> Self {
        self.busy_message = message.into();
        self
    }

    /// Reject tunables the stores cannot honour.
    ///
    /// TTL and retry interval are expressed in whole milliseconds on the wire,
    /// so anything below 1 ms is refused.
    pub fn validate(&self) -> Result<(), LockError> {
        if self.key.is_empty() {
            return Err(LockError::InvalidRequest("key must not be empty".to_string()));
        }
        if self.ttl.as_millis() == 0 {
            return Err(LockError::InvalidRequest(format!(
                "ttl must be at least 1ms, got {:?}",
                self.ttl
            )));
        }
        if self.retry_interval.as_millis() == 0 {
            return Err(LockError::InvalidRequest(format!(
                "retry interval must be at least 1ms, got {:?}",
                self.retry_interval
            )));
        }
        Ok(())
    }
}
