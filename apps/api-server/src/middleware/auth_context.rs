//! Authenticated-identity context middleware.
//!
//! The identity system itself lives outside this service; whatever fronts
//! it (gateway, session layer) forwards the resolved user id in a header.
//! This middleware lifts that header into an [`AuthenticatedUser`] request
//! extension so the rate limiter can key quota by user instead of IP.

use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, Transform, forward_ready},
};
use std::future::{Ready, ready};

/// Header carrying the upstream-resolved user id.
pub static USER_ID_HEADER: &str = "X-User-Id";

/// Request extension holding the authenticated user's id.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: String,
}

/// Middleware that populates [`AuthenticatedUser`] from the id header.
pub struct AuthContextMiddleware;

impl<S> Transform<S, ServiceRequest> for AuthContextMiddleware
where
    S: Service<ServiceRequest, Error = Error>,
{
    type Response = S::Response;
    type Error = Error;
    type Transform = AuthContextService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthContextService { service }))
    }
}

pub struct AuthContextService<S> {
    service: S,
}

impl<S> Service<ServiceRequest> for AuthContextService<S>
where
    S: Service<ServiceRequest, Error = Error>,
{
    type Response = S::Response;
    type Error = Error;
    type Future = S::Future;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let user_id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|id| !id.is_empty())
            .map(String::from);

        if let Some(id) = user_id {
            req.extensions_mut().insert(AuthenticatedUser { id });
        }

        self.service.call(req)
    }
}
