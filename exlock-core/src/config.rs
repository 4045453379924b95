//! Default tunables for lock requests.
//!
//! Options deserialize from any serde source with missing fields falling back
//! to defaults, and can be read from `EXLOCK_*` environment variables.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::resolver::LOCK_NAMESPACE;

pub const DEFAULT_TTL_MS: u64 = 30_000;
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 100;
pub const DEFAULT_BUSY_MESSAGE: &str = "operation in progress, please retry later";

pub const ENV_TTL_MS: &str = "EXLOCK_TTL_MS";
pub const ENV_WAIT_TIMEOUT_MS: &str = "EXLOCK_WAIT_TIMEOUT_MS";
pub const ENV_RETRY_INTERVAL_MS: &str = "EXLOCK_RETRY_INTERVAL_MS";
pub const ENV_NAMESPACE: &str = "EXLOCK_NAMESPACE";
pub const ENV_BUSY_MESSAGE: &str = "EXLOCK_BUSY_MESSAGE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockOptions {
    /// Claim lifetime in milliseconds
    pub ttl_ms: u64,
    /// Maximum polling time in milliseconds (0 = try once)
    pub wait_timeout_ms: u64,
    /// Delay between attempts in milliseconds
    pub retry_interval_ms: u64,
    /// Prefix added to resolved keys that lack it
    pub namespace: String,
    /// Message reported when the lock stays busy
    pub busy_message: String,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_TTL_MS,
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            namespace: LOCK_NAMESPACE.to_string(),
            busy_message: DEFAULT_BUSY_MESSAGE.to_string(),
        }
    }
}

impl LockOptions {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build options from an arbitrary variable lookup.
    ///
    /// Unset variables keep their default. Unparseable numbers are logged and
    /// also keep their default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let millis = |name: &str, default: u64| match lookup(name) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(variable = name, value = %raw, "ignoring malformed millisecond value");
                default
            }),
            None => default,
        };

        Self {
            ttl_ms: millis(ENV_TTL_MS, defaults.ttl_ms),
            wait_timeout_ms: millis(ENV_WAIT_TIMEOUT_MS, defaults.wait_timeout_ms),
            retry_interval_ms: millis(ENV_RETRY_INTERVAL_MS, defaults.retry_interval_ms),
            namespace: lookup(ENV_NAMESPACE).unwrap_or(defaults.namespace),
            busy_message: lookup(ENV_BUSY_MESSAGE).unwrap_or(defaults.busy_message),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}
