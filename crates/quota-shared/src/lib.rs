//! # Quota Shared
//!
//! Wire-visible types of the quota layer: rate limit header names and the
//! response bodies clients are expected to parse. Kept free of server
//! dependencies so clients can share the definitions.

pub mod headers;
pub mod response;

pub use headers::RateLimitHeaders;
pub use response::{ApiResponse, ErrorResponse, RateLimitExceeded};
