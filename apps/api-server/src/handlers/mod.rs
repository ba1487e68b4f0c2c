//! HTTP handlers and route configuration.

mod health;

use actix_web::{HttpResponse, web};
use quota_shared::ApiResponse;

pub use health::health_check;

use crate::middleware::{AuthContextMiddleware, RateLimitMiddleware};
use crate::state::AppState;

/// Configure API routes with their limiter classes.
///
/// The class is chosen per scope by the route wiring, never derived from
/// the request. Health stays unlimited so probes cannot be throttled out.
pub fn configure_routes(cfg: &mut web::ServiceConfig, state: &AppState) {
    cfg.service(
        web::scope("/api")
            .wrap(AuthContextMiddleware)
            .route("/health", web::get().to(health_check))
            .service(
                web::scope("")
                    .wrap(RateLimitMiddleware::new(state.gate.clone(), "general"))
                    .route("/ping", web::get().to(ping)),
            ),
    );
}

/// Minimal gated endpoint, mostly useful for smoke-testing quota headers.
async fn ping() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok("pong"))
}
