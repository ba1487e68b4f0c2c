//! Redis-backed counter store - the shared, cross-process backend.
//!
//! Sliding-window counting: each window maps to a bucket key; a check
//! atomically increments the current bucket and blends in the previous
//! bucket weighted by how much of it still overlaps the trailing window.
//! This smooths out the boundary bursts a plain fixed window permits.
//!
//! Every failure here - connection, timeout, protocol - surfaces as
//! [`StoreError::Backend`]. This store never fabricates a decision; the
//! degrade-and-fail-open policy lives in the admission gate.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Script};

use quota_core::ports::{RateLimitDecision, RateLimitStore, StoreError};
use quota_core::{CounterKey, RateLimitPolicy};

use super::unix_now;

/// Redis store configuration.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Per-call response timeout; exceeding it counts as a backend failure
    pub response_timeout: Duration,
    /// Key prefix for rate limit keys
    pub key_prefix: String,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_millis(500),
            key_prefix: "ratelimit".to_string(),
        }
    }
}

impl RedisStoreConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            response_timeout: Duration::from_millis(
                std::env::var("REDIS_RESPONSE_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
            ),
            key_prefix: std::env::var("RATE_LIMIT_KEY_PREFIX")
                .unwrap_or_else(|_| "ratelimit".to_string()),
        }
    }
}

/// Redis-backed sliding-window counter store.
pub struct SharedCounterStore {
    conn: ConnectionManager,
    config: RedisStoreConfig,
    /// Lua script for the atomic bucket increment
    script: Script,
}

impl SharedCounterStore {
    pub async fn new(config: RedisStoreConfig) -> Result<Self, StoreError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        // Use timeout to prevent hanging if Redis is unreachable
        let conn_manager_fut = ConnectionManager::new(client);
        let conn = tokio::time::timeout(config.connect_timeout, conn_manager_fut)
            .await
            .map_err(|_| StoreError::Backend("Connection timed out".to_string()))?
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        // Increment the current bucket (setting its TTL on first touch) and
        // read the previous bucket in one atomic unit.
        // Returns: [current_count, previous_count]
        let script = Script::new(
            r#"
            local window_secs = tonumber(ARGV[1])

            local current = redis.call('INCR', KEYS[1])
            if current == 1 then
                redis.call('EXPIRE', KEYS[1], window_secs * 2)
            end

            local previous = tonumber(redis.call('GET', KEYS[2]) or '0')
            return {current, previous}
            "#,
        );

        tracing::info!(url = %config.url, "Connected to Redis counter store");

        Ok(Self {
            conn,
            config,
            script,
        })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self, StoreError> {
        Self::new(RedisStoreConfig::from_env()).await
    }

    /// Reachability probe, usable without consuming any quota.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let fut = async move {
            let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, redis::RedisError>(pong)
        };

        tokio::time::timeout(self.config.response_timeout, fut)
            .await
            .map_err(|_| StoreError::Backend("Ping timed out".to_string()))?
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    fn bucket_keys(&self, key: &CounterKey, window_secs: u64, now: u64) -> (String, String) {
        let bucket = now / window_secs;
        let current = format!("{}:{}:{}", self.config.key_prefix, key.canonical(), bucket);
        let previous = format!(
            "{}:{}:{}",
            self.config.key_prefix,
            key.canonical(),
            bucket.saturating_sub(1)
        );
        (current, previous)
    }
}

#[async_trait]
impl RateLimitStore for SharedCounterStore {
    async fn check(
        &self,
        key: &CounterKey,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, StoreError> {
        let window_secs = policy.window.as_secs().max(1);
        let now = unix_now();
        let (current_key, previous_key) = self.bucket_keys(key, window_secs, now);

        let mut conn = self.conn.clone();
        let fut = async move {
            let counts: Vec<i64> = self
                .script
                .key(&current_key)
                .key(&previous_key)
                .arg(window_secs)
                .invoke_async(&mut conn)
                .await?;
            Ok::<_, redis::RedisError>(counts)
        };

        let counts: Vec<i64> = tokio::time::timeout(self.config.response_timeout, fut)
            .await
            .map_err(|_| StoreError::Backend("Check timed out".to_string()))?
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let current = counts.first().copied().unwrap_or(1).max(0) as u64;
        let previous = counts.get(1).copied().unwrap_or(0).max(0) as u64;

        // Weight the previous bucket by how much of it still overlaps the
        // trailing window. Rejected requests were already counted by the
        // INCR above - same no-rollback rule as the local store.
        let elapsed_fraction = (now % window_secs) as f64 / window_secs as f64;
        let blended = previous as f64 * (1.0 - elapsed_fraction) + current as f64;

        let allowed = blended <= policy.max_requests as f64;
        let used = blended.floor() as u32;
        let remaining = if allowed {
            policy.max_requests.saturating_sub(used)
        } else {
            0
        };
        // The current bucket closes at the next window boundary.
        let reset_at = (now / window_secs + 1) * window_secs;

        Ok(RateLimitDecision {
            allowed,
            limit: policy.max_requests,
            remaining,
            reset_at,
        })
    }
}
