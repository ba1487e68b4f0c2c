//! Domain-level error types.

use thiserror::Error;

/// Errors surfaced by the admission layer itself.
///
/// `UnknownClass` is a configuration mistake (a caller asked for a limiter
/// class that was never registered) and must fail loudly rather than
/// default to some permissive policy.
#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Unknown rate limit class: {0}")]
    UnknownClass(String),
}
