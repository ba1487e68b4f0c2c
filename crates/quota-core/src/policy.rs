//! Rate limit policies and the per-class registry.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

use crate::error::RateLimitError;

/// A single class policy: how many requests fit into one window.
///
/// Policies are configuration, not runtime state - they are loaded once at
/// process start and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitPolicy {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration.
    #[serde(serialize_with = "as_secs")]
    pub window: Duration,
}

fn as_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

impl RateLimitPolicy {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    /// Shorthand for per-minute style policies.
    pub fn per_window_secs(max_requests: u32, window_secs: u64) -> Self {
        Self::new(max_requests, Duration::from_secs(window_secs))
    }
}

/// Immutable table mapping a limiter class name to its policy.
///
/// Each class gets its own counters: exhausting "upload" for a caller never
/// touches that caller's "ai" budget.
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    policies: HashMap<String, RateLimitPolicy>,
}

impl PolicyRegistry {
    /// The built-in class table.
    pub fn builtin() -> Self {
        let mut policies = HashMap::new();
        policies.insert("upload".into(), RateLimitPolicy::per_window_secs(5, 60));
        policies.insert("external".into(), RateLimitPolicy::per_window_secs(20, 60));
        policies.insert("email".into(), RateLimitPolicy::per_window_secs(3, 60));
        policies.insert("ai".into(), RateLimitPolicy::per_window_secs(10, 60));
        policies.insert("general".into(), RateLimitPolicy::per_window_secs(30, 60));
        policies.insert(
            "notifications".into(),
            RateLimitPolicy::per_window_secs(100, 60),
        );
        Self { policies }
    }

    /// Empty registry, for tests and fully custom tables.
    pub fn empty() -> Self {
        Self {
            policies: HashMap::new(),
        }
    }

    /// Insert or replace a class policy. Only meaningful before the registry
    /// is handed to the gate; the registry is never mutated afterwards.
    pub fn register(&mut self, class: impl Into<String>, policy: RateLimitPolicy) {
        self.policies.insert(class.into(), policy);
    }

    /// Look up the policy for a class.
    pub fn policy_for(&self, class: &str) -> Result<RateLimitPolicy, RateLimitError> {
        self.policies
            .get(class)
            .copied()
            .ok_or_else(|| RateLimitError::UnknownClass(class.to_string()))
    }

    /// Iterate over registered class names and their policies.
    pub fn classes(&self) -> impl Iterator<Item = (&str, RateLimitPolicy)> {
        self.policies.iter().map(|(name, p)| (name.as_str(), *p))
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_matches_configuration() {
        let registry = PolicyRegistry::builtin();
        let upload = registry.policy_for("upload").unwrap();
        assert_eq!(upload.max_requests, 5);
        assert_eq!(upload.window, Duration::from_secs(60));

        let notifications = registry.policy_for("notifications").unwrap();
        assert_eq!(notifications.max_requests, 100);

        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn unknown_class_is_an_error() {
        let registry = PolicyRegistry::builtin();
        let err = registry.policy_for("does-not-exist").unwrap_err();
        assert!(matches!(err, RateLimitError::UnknownClass(name) if name == "does-not-exist"));
    }

    #[test]
    fn register_overrides_builtin() {
        let mut registry = PolicyRegistry::builtin();
        registry.register("upload", RateLimitPolicy::per_window_secs(50, 10));
        let upload = registry.policy_for("upload").unwrap();
        assert_eq!(upload.max_requests, 50);
        assert_eq!(upload.window, Duration::from_secs(10));
    }
}
