//! Application state - shared across all handlers.

use std::sync::Arc;

use quota_core::SharedStoreHealth;
use quota_core::ports::RateLimitStore;
use quota_infra::{AdmissionGate, AvailabilityMonitor, LocalCounterStore, SharedCounterStore};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AdmissionGate>,
    pub local: Arc<LocalCounterStore>,
}

impl AppState {
    /// Build the application state with appropriate store backends.
    ///
    /// The shared store is optional three ways: disabled by flag, not
    /// constructible, or unreachable at the startup probe. In every one of
    /// those cases enforcement starts out local and the process keeps
    /// serving.
    pub async fn new(config: &AppConfig) -> Self {
        let local = Arc::new(LocalCounterStore::new());
        let monitor = AvailabilityMonitor::new(SharedStoreHealth::new());

        let shared: Option<Arc<dyn RateLimitStore>> = if config.disable_redis {
            monitor.disable("DISABLE_REDIS is set");
            None
        } else {
            match SharedCounterStore::new(config.redis.clone()).await {
                Ok(store) => {
                    let store = Arc::new(store);
                    monitor.probe_at_startup(&store).await;

                    if let Some(interval) = config.reprobe_interval {
                        tracing::info!(
                            interval_secs = interval.as_secs(),
                            "Shared store re-probing enabled"
                        );
                        monitor.spawn_reprobe(store.clone(), interval);
                    }

                    Some(store as Arc<dyn RateLimitStore>)
                }
                Err(error) => {
                    monitor.record_failure(&error);
                    None
                }
            }
        };

        let gate = Arc::new(AdmissionGate::new(
            config.registry(),
            local.clone() as Arc<dyn RateLimitStore>,
            shared,
            monitor,
        ));

        tracing::info!("Application state initialized");

        Self { gate, local }
    }
}
