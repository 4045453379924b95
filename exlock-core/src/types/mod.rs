mod claim;
mod request;

pub use claim::LockClaim;
pub use request::LockRequest;

pub(crate) use claim::new_token;
