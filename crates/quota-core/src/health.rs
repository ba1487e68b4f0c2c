//! Shared-store health state.
//!
//! A single process-wide flag decides whether checks route through the
//! shared counter store or the local fallback. Writers only ever push the
//! flag towards `Degraded` (promotion back to `Healthy` is reserved for the
//! explicit re-probe path), so relaxed atomic writes are sufficient - there
//! is no race two writers could lose.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Health of the shared counter store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreHealth {
    /// Startup probe has not run yet.
    Unknown,
    /// Shared store reachable; checks route through it.
    Healthy,
    /// Shared store failed or absent; checks route through the local store.
    Degraded,
}

const UNKNOWN: u8 = 0;
const HEALTHY: u8 = 1;
const DEGRADED: u8 = 2;

/// Cloneable handle to the process-wide [`StoreHealth`] flag.
///
/// Injected explicitly wherever it is read or written, so tests can run
/// with isolated flags instead of leaking state through a global.
#[derive(Debug, Clone)]
pub struct SharedStoreHealth(Arc<AtomicU8>);

impl SharedStoreHealth {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(UNKNOWN)))
    }

    pub fn get(&self) -> StoreHealth {
        match self.0.load(Ordering::Relaxed) {
            HEALTHY => StoreHealth::Healthy,
            DEGRADED => StoreHealth::Degraded,
            _ => StoreHealth::Unknown,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.get() == StoreHealth::Healthy
    }

    pub fn set_healthy(&self) {
        self.0.store(HEALTHY, Ordering::Relaxed);
    }

    /// Demote to `Degraded`. Returns true only for the transition that
    /// actually changed the state, so callers can log the event once.
    pub fn mark_degraded(&self) -> bool {
        self.0.swap(DEGRADED, Ordering::Relaxed) != DEGRADED
    }
}

impl Default for SharedStoreHealth {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unknown() {
        let health = SharedStoreHealth::new();
        assert_eq!(health.get(), StoreHealth::Unknown);
        assert!(!health.is_healthy());
    }

    #[test]
    fn mark_degraded_reports_only_the_first_transition() {
        let health = SharedStoreHealth::new();
        health.set_healthy();
        assert!(health.is_healthy());

        assert!(health.mark_degraded());
        assert!(!health.mark_degraded());
        assert_eq!(health.get(), StoreHealth::Degraded);
    }

    #[test]
    fn handles_share_one_flag() {
        let health = SharedStoreHealth::new();
        let other = health.clone();
        health.set_healthy();
        assert!(other.is_healthy());
    }
}
