//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use quota_core::{PolicyRegistry, RateLimitPolicy};
use quota_infra::RedisStoreConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Force local-only enforcement, regardless of Redis reachability.
    pub disable_redis: bool,
    pub redis: RedisStoreConfig,
    /// When set, a degraded shared store is re-probed on this interval.
    /// Unset (the default) keeps the one-way degrade behavior.
    pub reprobe_interval: Option<Duration>,
    policy_overrides: Vec<(String, RateLimitPolicy)>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            disable_redis: env::var("DISABLE_REDIS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            redis: RedisStoreConfig::from_env(),
            reprobe_interval: env::var("REPROBE_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
            policy_overrides: Self::parse_policy_overrides(),
        }
    }

    /// The class registry: the built-in table plus any env overrides.
    pub fn registry(&self) -> PolicyRegistry {
        let mut registry = PolicyRegistry::builtin();
        for (class, policy) in &self.policy_overrides {
            tracing::info!(
                class = %class,
                max_requests = policy.max_requests,
                window_secs = policy.window.as_secs(),
                "Policy override applied"
            );
            registry.register(class.clone(), *policy);
        }
        registry
    }

    /// Parse per-class policy overrides from environment.
    /// Format: RATE_LIMIT_CLASS_<NAME>=<MAX_REQUESTS>,<WINDOW_SECS>
    /// Example: RATE_LIMIT_CLASS_UPLOAD=10,30
    fn parse_policy_overrides() -> Vec<(String, RateLimitPolicy)> {
        let mut overrides = Vec::new();

        for (key, value) in env::vars() {
            if let Some(name) = key.strip_prefix("RATE_LIMIT_CLASS_") {
                let parts: Vec<&str> = value.splitn(2, ',').collect();
                let max_requests: Option<u32> = parts.first().and_then(|s| s.trim().parse().ok());
                let window_secs: Option<u64> = parts.get(1).and_then(|s| s.trim().parse().ok());

                match (max_requests, window_secs) {
                    (Some(max), Some(secs)) if max > 0 && secs > 0 => {
                        overrides.push((
                            name.to_lowercase(),
                            RateLimitPolicy::per_window_secs(max, secs),
                        ));
                    }
                    _ => {
                        tracing::warn!(key = %key, value = %value, "Ignoring malformed policy override");
                    }
                }
            }
        }

        overrides
    }
}
