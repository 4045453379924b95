//! Distributed mutual exclusion over a [`CoordinationStore`].
//!
//! One acquisition moves through
//! `ACQUIRING -> ACQUIRED -> RELEASED`, or ends in `ACQUIRING -> TIMED_OUT`
//! ([`LockError::Busy`]) or `ACQUIRING -> FAILED`
//! ([`LockError::StoreUnavailable`]). The protected operation only runs on the
//! first path.

use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, warn};

use crate::config::LockOptions;
use crate::error::{LockError, StoreError};
use crate::infrastructure::CoordinationStore;
use crate::resolver::{KeyResolver, namespaced};
use crate::types::{LockClaim, LockRequest, new_token};

/// What happened when a claim was handed back to the store.
///
/// None of these change the outcome of the protected operation.
#[derive(Debug)]
pub enum ReleaseOutcome {
    /// The key still held our token and was deleted.
    Released,
    /// The key had expired or belongs to a newer claim; nothing was touched.
    Ineffective,
    /// The store could not be reached. The claim lapses after its TTL.
    Failed(StoreError),
}

impl ReleaseOutcome {
    pub fn is_released(&self) -> bool {
        matches!(self, ReleaseOutcome::Released)
    }
}

/// Runs critical sections exclusively across every process sharing the store.
pub struct DistributedLock<S: CoordinationStore + ?Sized + 'static = dyn CoordinationStore> {
    store: Arc<S>,
    resolver: KeyResolver,
    options: LockOptions,
}

impl<S: CoordinationStore + ?Sized + 'static> DistributedLock<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_options(store, LockOptions::default())
    }

    pub fn with_options(store: Arc<S>, options: LockOptions) -> Self {
        Self {
            store,
            resolver: KeyResolver::new(),
            options,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn options(&self) -> &LockOptions {
        &self.options
    }

    /// Build a request by resolving `template` against the call arguments.
    ///
    /// The namespace from the options is prepended when missing and the
    /// tunables start from the option defaults.
    pub fn request(&self, template: &str, args: &[Value]) -> LockRequest {
        let key = namespaced(&self.resolver.resolve(template, args), &self.options.namespace);
        if key.contains("#{") {
            warn!(key = %key, template, "lock key contains unresolved placeholders");
        }
        LockRequest::from_options(key, &self.options)
    }

    /// Poll the store until the claim is taken or the wait timeout passes.
    pub async fn acquire(&self, request: &LockRequest) -> Result<LockGuard<S>, LockError> {
        request.validate()?;

        let token = new_token();
        let started = Instant::now();
        let mut attempts: u32 = 0;

        debug!(key = %request.key, "attempting to acquire lock");

        loop {
            attempts += 1;
            match self
                .store
                .conditional_set(&request.key, &token, request.ttl)
                .await
            {
                Ok(true) => {
                    debug!(key = %request.key, attempts, "lock acquired");
                    let claim = LockClaim::new(request.key.clone(), token);
                    return Ok(LockGuard::new(Arc::clone(&self.store), claim));
                }
                Ok(false) => {}
                Err(source) => {
                    error!(key = %request.key, attempts, error = %source, "error acquiring lock");
                    return Err(LockError::StoreUnavailable {
                        key: request.key.clone(),
                        source,
                    });
                }
            }

            let waited = started.elapsed();
            if waited >= request.wait_timeout {
                warn!(
                    key = %request.key,
                    attempts,
                    waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                    "failed to acquire lock"
                );
                return Err(LockError::Busy {
                    key: request.key.clone(),
                    waited,
                    message: request.busy_message.clone(),
                });
            }

            sleep(request.retry_interval).await;
        }
    }

    /// Run `operation` while holding the lock described by `request`.
    ///
    /// The operation's output is returned untouched, so an operation yielding
    /// `Result<T, E>` comes back as `Ok(Err(e))` when it fails. The claim is
    /// released whatever the operation does, including panicking.
    pub async fn run_exclusive<F, Fut>(
        &self,
        request: &LockRequest,
        operation: F,
    ) -> Result<Fut::Output, LockError>
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let guard = self.acquire(request).await?;
        let output = operation().await;
        guard.release().await;
        Ok(output)
    }

    /// Like [`run_exclusive`](Self::run_exclusive) for operations whose error
    /// type can absorb a [`LockError`].
    pub async fn try_run_exclusive<F, Fut, T, E>(
        &self,
        request: &LockRequest,
        operation: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<LockError>,
    {
        self.run_exclusive(request, operation).await?
    }
}

/// A held claim.
///
/// Call [`release`](Self::release) to hand it back and observe the outcome.
/// Dropping an unreleased guard schedules the release on the current tokio
/// runtime; without a runtime the claim lapses after its TTL.
pub struct LockGuard<S: CoordinationStore + ?Sized + 'static = dyn CoordinationStore> {
    store: Arc<S>,
    claim: Option<LockClaim>,
}

impl<S: CoordinationStore + ?Sized + 'static> LockGuard<S> {
    fn new(store: Arc<S>, claim: LockClaim) -> Self {
        Self {
            store,
            claim: Some(claim),
        }
    }

    pub fn claim(&self) -> Option<&LockClaim> {
        self.claim.as_ref()
    }

    /// Delete the claim if it is still ours.
    ///
    /// The claim stays in the guard until the delete completes, so dropping
    /// this future midway still schedules a release from `Drop`.
    pub async fn release(mut self) -> ReleaseOutcome {
        // Emptied only below or in `drop`, neither of which can run before this
        let Some(claim) = self.claim.as_ref() else {
            return ReleaseOutcome::Ineffective;
        };
        let outcome = release_claim(self.store.as_ref(), claim).await;
        self.claim = None;
        outcome
    }
}

impl<S: CoordinationStore + ?Sized + 'static> Drop for LockGuard<S> {
    fn drop(&mut self) {
        let Some(claim) = self.claim.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = Arc::clone(&self.store);
                handle.spawn(async move {
                    release_claim(store.as_ref(), &claim).await;
                });
            }
            Err(_) => {
                warn!(
                    key = claim.key(),
                    "lock guard dropped outside a runtime; claim will lapse after its ttl"
                );
            }
        }
    }
}

async fn release_claim<S: CoordinationStore + ?Sized>(
    store: &S,
    claim: &LockClaim,
) -> ReleaseOutcome {
    match store.conditional_delete(claim.key(), claim.token()).await {
        Ok(true) => {
            debug!(key = claim.key(), "lock released");
            ReleaseOutcome::Released
        }
        Ok(false) => {
            warn!(key = claim.key(), "failed to release lock (may have expired)");
            ReleaseOutcome::Ineffective
        }
        Err(e) => {
            error!(key = claim.key(), error = %e, "error releasing lock");
            ReleaseOutcome::Failed(e)
        }
    }
}
