//! Availability monitoring for the shared counter store.
//!
//! The monitor owns the process-wide health flag: a startup probe decides
//! the initial routing, and the first failed shared-store call demotes the
//! process to local enforcement for good (one-way breaker). An opt-in
//! re-probe task can restore shared enforcement after a transient outage;
//! it is off by default to preserve the one-way contract.

use quota_core::ports::StoreError;
use quota_core::{SharedStoreHealth, StoreHealth};

#[cfg(feature = "redis")]
use std::sync::Arc;
#[cfg(feature = "redis")]
use std::time::Duration;

#[cfg(feature = "redis")]
use crate::store::SharedCounterStore;

/// Decides, per process, whether checks route through the shared store.
#[derive(Debug, Clone)]
pub struct AvailabilityMonitor {
    health: SharedStoreHealth,
}

impl AvailabilityMonitor {
    pub fn new(health: SharedStoreHealth) -> Self {
        Self { health }
    }

    pub fn health(&self) -> StoreHealth {
        self.health.get()
    }

    pub fn is_healthy(&self) -> bool {
        self.health.is_healthy()
    }

    /// Mark the shared store unusable without probing it (absent
    /// configuration, or explicitly disabled).
    pub fn disable(&self, reason: &str) {
        self.health.mark_degraded();
        tracing::info!(reason, "Shared counter store not in use, enforcing locally");
    }

    /// Record a failed shared-store call. Demotes immediately; the
    /// transition is logged once, repeats only at debug level.
    pub fn record_failure(&self, error: &StoreError) {
        if self.health.mark_degraded() {
            tracing::warn!(
                error = %error,
                "Shared counter store failed, degrading to local enforcement"
            );
        } else {
            tracing::debug!(error = %error, "Shared counter store still failing");
        }
    }

    /// Probe the shared store once at startup and set the initial health.
    #[cfg(feature = "redis")]
    pub async fn probe_at_startup(&self, store: &SharedCounterStore) {
        match store.ping().await {
            Ok(()) => {
                self.health.set_healthy();
                tracing::info!("Shared counter store reachable, routing checks through it");
            }
            Err(error) => {
                self.health.mark_degraded();
                tracing::warn!(
                    error = %error,
                    "Shared counter store unreachable at startup, enforcing locally"
                );
            }
        }
    }

    /// Spawn a background task that pings a degraded shared store on a
    /// fixed interval and promotes it back to `Healthy` when it answers.
    ///
    /// Never touches the request path: probes run on their own task and
    /// are bounded by the store's response timeout.
    #[cfg(feature = "redis")]
    pub fn spawn_reprobe(
        &self,
        store: Arc<SharedCounterStore>,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let health = self.health.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it so a fresh degrade
            // is not re-probed before the interval has passed.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                if health.is_healthy() {
                    continue;
                }

                if store.ping().await.is_ok() {
                    health.set_healthy();
                    tracing::info!("Shared counter store answering again, restoring shared enforcement");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_failure_degrades_once() {
        let health = SharedStoreHealth::new();
        health.set_healthy();
        let monitor = AvailabilityMonitor::new(health.clone());

        monitor.record_failure(&StoreError::Backend("boom".into()));
        assert_eq!(monitor.health(), StoreHealth::Degraded);

        // Second failure is a no-op transition-wise.
        monitor.record_failure(&StoreError::Backend("still down".into()));
        assert_eq!(monitor.health(), StoreHealth::Degraded);
    }

    #[test]
    fn disable_skips_the_probe() {
        let monitor = AvailabilityMonitor::new(SharedStoreHealth::new());
        monitor.disable("test");
        assert_eq!(monitor.health(), StoreHealth::Degraded);
    }
}
