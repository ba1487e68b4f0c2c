//! Rate limit response headers.
//!
//! Every gated response carries the three `X-RateLimit-*` headers so
//! clients can self-throttle; `Retry-After` is added only on rejection.

/// Maximum requests permitted in the current window.
pub const LIMIT: &str = "x-ratelimit-limit";
/// Requests left in the current window.
pub const REMAINING: &str = "x-ratelimit-remaining";
/// Unix timestamp (seconds) at which the window resets.
pub const RESET: &str = "x-ratelimit-reset";
/// Seconds until a rejected caller should retry.
pub const RETRY_AFTER: &str = "retry-after";

/// Rendered header set for one decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub limit: String,
    pub remaining: String,
    pub reset: String,
    /// Present only for rejected requests.
    pub retry_after: Option<String>,
}

impl RateLimitHeaders {
    pub fn allowed(limit: u32, remaining: u32, reset_at: u64) -> Self {
        Self {
            limit: limit.to_string(),
            remaining: remaining.to_string(),
            reset: reset_at.to_string(),
            retry_after: None,
        }
    }

    pub fn rejected(limit: u32, reset_at: u64, retry_after_secs: u64) -> Self {
        Self {
            limit: limit.to_string(),
            remaining: "0".to_string(),
            reset: reset_at.to_string(),
            retry_after: Some(retry_after_secs.to_string()),
        }
    }

    /// Header `(name, value)` pairs in wire order.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![
            (LIMIT, self.limit.as_str()),
            (REMAINING, self.remaining.as_str()),
            (RESET, self.reset.as_str()),
        ];
        if let Some(retry_after) = &self.retry_after {
            pairs.push((RETRY_AFTER, retry_after.as_str()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_omits_retry_after() {
        let headers = RateLimitHeaders::allowed(30, 12, 1_700_000_060);
        let pairs = headers.pairs();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0], (LIMIT, "30"));
        assert_eq!(pairs[1], (REMAINING, "12"));
        assert_eq!(pairs[2], (RESET, "1700000060"));
    }

    #[test]
    fn rejected_pins_remaining_and_adds_retry_after() {
        let headers = RateLimitHeaders::rejected(5, 1_700_000_060, 42);
        assert_eq!(headers.remaining, "0");
        let pairs = headers.pairs();
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[3], (RETRY_AFTER, "42"));
    }
}
