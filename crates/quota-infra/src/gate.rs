//! The admission gate - the single public entry point of the limiter.
//!
//! Routing: shared store while healthy, local store otherwise, with the
//! degrade happening mid-request when a shared call fails (the request
//! falls through to the local store instead of being dropped). The gate is
//! also the one and only place that fails open: an unexpected store fault
//! produces a generous `allowed` decision rather than a blocked request.

use std::sync::Arc;

use quota_core::ports::{RateLimitDecision, RateLimitStore};
use quota_core::{CounterKey, Identifier, PolicyRegistry, RateLimitError, RateLimitPolicy, StoreHealth};

use crate::monitor::AvailabilityMonitor;
use crate::store::unix_now;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy)]
pub struct GateDecision {
    pub decision: RateLimitDecision,
    /// True when the decision came from the local fallback store.
    pub degraded: bool,
}

impl GateDecision {
    pub fn allowed(&self) -> bool {
        self.decision.allowed
    }

    /// Seconds until the caller may retry; only meaningful on rejection.
    pub fn retry_after_secs(&self) -> u64 {
        self.decision.retry_after_secs(unix_now())
    }
}

/// Gates requests against the per-class quota.
pub struct AdmissionGate {
    registry: PolicyRegistry,
    local: Arc<dyn RateLimitStore>,
    shared: Option<Arc<dyn RateLimitStore>>,
    monitor: AvailabilityMonitor,
}

impl AdmissionGate {
    pub fn new(
        registry: PolicyRegistry,
        local: Arc<dyn RateLimitStore>,
        shared: Option<Arc<dyn RateLimitStore>>,
        monitor: AvailabilityMonitor,
    ) -> Self {
        Self {
            registry,
            local,
            shared,
            monitor,
        }
    }

    /// Count one request for `identifier` against `class` and decide.
    ///
    /// The only error this returns is [`RateLimitError::UnknownClass`] - a
    /// configuration mistake. Backend failures degrade, internal faults
    /// fail open; neither surfaces to the caller.
    pub async fn admit(
        &self,
        class: &str,
        identifier: &Identifier,
    ) -> Result<GateDecision, RateLimitError> {
        let policy = self.registry.policy_for(class)?;
        let key = CounterKey::new(class, identifier.clone());

        if let Some(shared) = &self.shared
            && self.monitor.is_healthy()
        {
            match shared.check(&key, &policy).await {
                Ok(decision) => {
                    tracing::debug!(key = %key, remaining = decision.remaining, "Shared store decision");
                    return Ok(GateDecision {
                        decision,
                        degraded: false,
                    });
                }
                Err(error) => {
                    // Degrade and fall through to the local store for this
                    // same request; no request is dropped over a backend
                    // failure.
                    self.monitor.record_failure(&error);
                }
            }
        }

        let decision = match self.local.check(&key, &policy).await {
            Ok(decision) => decision,
            Err(error) => {
                tracing::error!(key = %key, error = %error, "Counter store fault, failing open");
                Self::fail_open(&policy)
            }
        };

        tracing::debug!(key = %key, remaining = decision.remaining, "Local store decision");
        Ok(GateDecision {
            decision,
            degraded: true,
        })
    }

    /// Health of the shared backend, for the health endpoint.
    pub fn backend_health(&self) -> StoreHealth {
        self.monitor.health()
    }

    /// Registered class names and policies, for the health endpoint.
    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    // Availability over strict accounting: an internal bug in a store must
    // never block all traffic.
    fn fail_open(policy: &RateLimitPolicy) -> RateLimitDecision {
        RateLimitDecision {
            allowed: true,
            limit: policy.max_requests,
            remaining: policy.max_requests.saturating_sub(1),
            reset_at: unix_now() + policy.window.as_secs(),
        }
    }
}
