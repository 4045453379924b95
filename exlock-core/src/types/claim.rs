use std::time::{SystemTime, UNIX_EPOCH};

/// Proof of a successful acquisition.
///
/// The token is the only ownership witness: release deletes the key only while
/// the store still holds this exact token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockClaim {
    key: String,
    token: String,
}

impl LockClaim {
    pub(crate) fn new(key: String, token: String) -> Self {
        Self { key, token }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// `"{pid}-{unix_millis}-{nanoid}"`, unique per acquisition attempt.
pub(crate) fn new_token() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("{}-{}-{}", std::process::id(), millis, nanoid::nanoid!(12))
}
