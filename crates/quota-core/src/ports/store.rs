//! Counter store port.

use async_trait::async_trait;
use serde::Serialize;

use crate::identifier::CounterKey;
use crate::policy::RateLimitPolicy;

/// Counter store trait - abstraction over counting backends.
///
/// Both the shared (networked, cross-process) store and the local
/// (in-process) fallback implement this; the admission gate depends on
/// nothing else about them. A store reports failures as [`StoreError`] -
/// it never decides to fail open itself, that policy belongs to the gate.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one request against `key` and decide whether it is admitted.
    async fn check(
        &self,
        key: &CounterKey,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, StoreError>;
}

/// Result of a rate limit check.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Unix timestamp (seconds) at which the window resets.
    pub reset_at: u64,
}

impl RateLimitDecision {
    /// Seconds a rejected caller should wait before retrying, never
    /// negative even if the window has already elapsed.
    pub fn retry_after_secs(&self, now: u64) -> u64 {
        self.reset_at.saturating_sub(now)
    }
}

/// Counter store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Network error, timeout, or malformed response from the shared store.
    /// Triggers the degrade path.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Unexpected internal fault (a bug, not a network condition).
    /// The gate recovers by failing open.
    #[error("Internal store fault: {0}")]
    Internal(String),
}
