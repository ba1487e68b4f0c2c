//! Health check endpoint.

use actix_web::{HttpResponse, web};
use serde::Serialize;

use quota_core::StoreHealth;

use crate::state::AppState;

#[derive(Serialize)]
pub struct RateLimitStatus {
    /// Health of the shared counter store backend.
    pub backend: StoreHealth,
    /// Live counter entries in the local store.
    pub active_keys: usize,
    /// Number of registered limiter classes.
    pub classes: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub rate_limit: RateLimitStatus,
}

/// Health check endpoint - returns server status and limiter backend state.
///
/// GET /api/health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let response = HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        rate_limit: RateLimitStatus {
            backend: state.gate.backend_health(),
            active_keys: state.local.len().await,
            classes: state.gate.registry().len(),
        },
    };

    HttpResponse::Ok().json(response)
}
