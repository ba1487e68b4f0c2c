//! In-process counter store - the fallback when the shared store is
//! unavailable.
//!
//! Fixed-window counting: the first request for a key opens a window, every
//! request inside it increments the count, and the count resets entirely
//! once the window ends. Unlike the shared store's sliding window this
//! permits a burst of up to `2 * max_requests` straddling a boundary; that
//! imprecision is accepted in exchange for zero network dependencies.
//! Limits are per-process, not shared across instances.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use quota_core::ports::{RateLimitDecision, RateLimitStore, StoreError};
use quota_core::{CounterKey, RateLimitPolicy};

use super::unix_now_ms;

/// One window's worth of counting for a single key.
#[derive(Debug, Clone, Copy)]
struct CounterEntry {
    count: u32,
    #[allow(dead_code)]
    window_start: u64,
    window_end: u64,
}

/// In-memory fixed-window counter store.
pub struct LocalCounterStore {
    // One lock around the whole table: the read-modify-write in `check`
    // must be atomic per key, and the critical section is a few map
    // operations, so a coarse lock is cheaper than per-key locks here.
    entries: Mutex<HashMap<String, CounterEntry>>,
}

impl LocalCounterStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Evict every entry whose window has already ended.
    ///
    /// Advisory cleanup only - `check` already treats expired entries as
    /// absent. This just bounds memory to keys active in the last window.
    /// Returns the number of entries removed.
    pub async fn sweep(&self) -> usize {
        let now = unix_now_ms();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.window_end >= now);
        let removed = before - entries.len();

        if removed > 0 {
            tracing::debug!(removed, remaining = entries.len(), "Swept expired counter entries");
        }

        removed
    }

    /// Number of live (tracked) counter entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop all counters. Useful for tests.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

impl Default for LocalCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimitStore for LocalCounterStore {
    async fn check(
        &self,
        key: &CounterKey,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, StoreError> {
        let now = unix_now_ms();
        let window_ms = policy.window.as_millis() as u64;
        let canonical = key.canonical();

        // The lock is held across the whole read-modify-write so two
        // concurrent requests can never both claim the last slot.
        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.get_mut(&canonical)
            && now <= entry.window_end
        {
            // Over-limit requests still consume a slot (no rollback);
            // the window resets on time alone, never on count.
            entry.count += 1;
            let allowed = entry.count <= policy.max_requests;
            return Ok(RateLimitDecision {
                allowed,
                limit: policy.max_requests,
                remaining: policy.max_requests.saturating_sub(entry.count),
                reset_at: entry.window_end.div_ceil(1000),
            });
        }

        // First request for the key, or the previous window expired: open a
        // fresh window. Expired entries are replaced, never merged.
        let entry = CounterEntry {
            count: 1,
            window_start: now,
            window_end: now + window_ms,
        };
        let reset_at = entry.window_end.div_ceil(1000);
        entries.insert(canonical, entry);

        Ok(RateLimitDecision {
            allowed: true,
            limit: policy.max_requests,
            remaining: policy.max_requests.saturating_sub(1),
            reset_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use quota_core::Identifier;

    use super::*;

    fn key(class: &str, user: &str) -> CounterKey {
        CounterKey::new(class, Identifier::user(user))
    }

    fn policy(max: u32, window: Duration) -> RateLimitPolicy {
        RateLimitPolicy::new(max, window)
    }

    #[tokio::test]
    async fn admits_exactly_the_configured_count() {
        let store = LocalCounterStore::new();
        let p = policy(5, Duration::from_secs(60));
        let k = key("upload", "42");

        for expected_remaining in (0..5).rev() {
            let decision = store.check(&k, &p).await.unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.limit, 5);
            assert_eq!(decision.remaining, expected_remaining);
        }

        let decision = store.check(&k, &p).await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[tokio::test]
    async fn keys_are_isolated_across_classes_and_identifiers() {
        let store = LocalCounterStore::new();
        let p = policy(2, Duration::from_secs(60));

        // Exhaust (upload, user:42).
        store.check(&key("upload", "42"), &p).await.unwrap();
        store.check(&key("upload", "42"), &p).await.unwrap();
        let exhausted = store.check(&key("upload", "42"), &p).await.unwrap();
        assert!(!exhausted.allowed);

        // Same class, different identifier: untouched.
        let other_user = store.check(&key("upload", "43"), &p).await.unwrap();
        assert!(other_user.allowed);
        assert_eq!(other_user.remaining, 1);

        // Same identifier, different class: untouched.
        let other_class = store.check(&key("email", "42"), &p).await.unwrap();
        assert!(other_class.allowed);
        assert_eq!(other_class.remaining, 1);
    }

    #[tokio::test]
    async fn window_resets_on_time_not_on_count() {
        let store = LocalCounterStore::new();
        let p = policy(2, Duration::from_millis(200));
        let k = key("email", "7");

        store.check(&k, &p).await.unwrap();
        store.check(&k, &p).await.unwrap();
        // Rejected requests keep counting; the reset stays time-based.
        assert!(!store.check(&k, &p).await.unwrap().allowed);
        assert!(!store.check(&k, &p).await.unwrap().allowed);

        tokio::time::sleep(Duration::from_millis(250)).await;

        let fresh = store.check(&k, &p).await.unwrap();
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 1);
    }

    #[tokio::test]
    async fn fixed_window_permits_a_boundary_burst() {
        // Pins the documented trade-off versus the shared store's sliding
        // window: a full budget on each side of a boundary is admitted.
        let store = LocalCounterStore::new();
        let p = policy(3, Duration::from_millis(300));
        let k = key("general", "9");

        for _ in 0..3 {
            assert!(store.check(&k, &p).await.unwrap().allowed);
        }
        tokio::time::sleep(Duration::from_millis(350)).await;
        for _ in 0..3 {
            assert!(store.check(&k, &p).await.unwrap().allowed);
        }
    }

    #[tokio::test]
    async fn concurrent_burst_admits_exactly_the_limit() {
        let store = Arc::new(LocalCounterStore::new());
        let p = policy(5, Duration::from_secs(60));

        let mut tasks = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let k = key("upload", "burst");
                store.check(&k, &p).await.unwrap().allowed
            }));
        }

        let mut admitted = 0;
        for task in tasks {
            if task.await.unwrap() {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 5);
    }

    #[tokio::test]
    async fn sweep_evicts_only_expired_entries() {
        let store = LocalCounterStore::new();
        let short = policy(5, Duration::from_millis(100));
        let long = policy(5, Duration::from_secs(60));

        store.check(&key("email", "a"), &short).await.unwrap();
        store.check(&key("email", "b"), &long).await.unwrap();
        assert_eq!(store.len().await, 2);

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(store.sweep().await, 1);
        assert_eq!(store.len().await, 1);

        // The surviving long-window key still has its count.
        let decision = store.check(&key("email", "b"), &long).await.unwrap();
        assert_eq!(decision.remaining, 3);
    }
}
