//! Middleware modules.

pub mod auth_context;
pub mod rate_limit;

pub use auth_context::{AuthContextMiddleware, AuthenticatedUser};
pub use rate_limit::RateLimitMiddleware;
