//! Standardized response bodies.

use serde::{Deserialize, Serialize};

/// Standard successful API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }
}

/// Machine-readable 429 body.
///
/// The field set is a stable wire contract: `error` is the fixed marker
/// string, `reset` is a unix timestamp in seconds, `remaining` is always 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitExceeded {
    pub error: String,
    pub message: String,
    pub limit: u32,
    pub remaining: u32,
    pub reset: u64,
}

impl RateLimitExceeded {
    pub fn new(limit: u32, reset: u64, retry_after_secs: u64) -> Self {
        Self {
            error: "Rate limit exceeded".to_string(),
            message: format!("Too many requests. Try again in {retry_after_secs} seconds."),
            limit,
            remaining: 0,
            reset,
        }
    }
}

/// RFC 7807 Problem Details for HTTP APIs.
///
/// Used for the limiter's own failures (an unregistered class is a 500,
/// never a silent pass).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// A URI reference that identifies the problem type.
    #[serde(rename = "type")]
    pub error_type: String,

    /// A short, human-readable summary of the problem type.
    pub title: String,

    /// The HTTP status code.
    pub status: u16,

    /// A human-readable explanation specific to this occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn new(status: u16, title: impl Into<String>) -> Self {
        Self {
            error_type: "about:blank".to_string(),
            title: title.into(),
            status,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn internal_error() -> Self {
        Self::new(500, "Internal Server Error")
    }
}
