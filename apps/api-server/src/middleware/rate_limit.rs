//! Rate limiting middleware - the request wrapper around the admission
//! gate.
//!
//! Constructed per route scope with a limiter class. On acceptance the
//! inner service runs exactly once and the quota headers are merged into
//! whatever it produces, including error responses. On rejection the inner
//! service is never called and the client gets a 429 with a machine-
//! readable body and `Retry-After`.

use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{HeaderMap, HeaderName, HeaderValue},
};
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use quota_core::Identifier;
use quota_infra::{AdmissionGate, GateDecision};
use quota_shared::{ErrorResponse, RateLimitExceeded, RateLimitHeaders};

use super::auth_context::AuthenticatedUser;

/// Rate limiting middleware factory.
pub struct RateLimitMiddleware {
    gate: Arc<AdmissionGate>,
    class: &'static str,
}

impl RateLimitMiddleware {
    pub fn new(gate: Arc<AdmissionGate>, class: &'static str) -> Self {
        Self { gate, class }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            gate: self.gate.clone(),
            class: self.class,
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    gate: Arc<AdmissionGate>,
    class: &'static str,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let gate = self.gate.clone();
        let class = self.class;

        Box::pin(async move {
            let identifier = resolve_identifier(&req);

            let result = match gate.admit(class, &identifier).await {
                Ok(result) => result,
                Err(error) => {
                    // Misconfiguration (unknown class): fail loudly, not
                    // permissively.
                    tracing::error!(class, error = %error, "Rate limiter misconfigured");
                    let response = HttpResponse::InternalServerError()
                        .json(ErrorResponse::internal_error().with_detail(error.to_string()));
                    let (http_req, _payload) = req.into_parts();
                    return Ok(ServiceResponse::new(http_req, response).map_into_right_body());
                }
            };

            if !result.allowed() {
                tracing::warn!(class, identifier = %identifier, "Rate limit exceeded");
                return Ok(reject(req, &result));
            }

            let decision = result.decision;
            let headers = RateLimitHeaders::allowed(
                decision.limit,
                decision.remaining,
                decision.reset_at,
            );

            // Holding a clone of the request across the inner call panics
            // inside actix's router (a cloned `HttpRequest` cannot be
            // mutated during route matching), so quota headers survive a
            // failing inner service by travelling on the error's response.
            match service.call(req).await {
                Ok(mut res) => {
                    merge_headers(res.headers_mut(), &headers);
                    Ok(res.map_into_left_body())
                }
                Err(error) => {
                    let message = error.to_string();
                    let mut response = HttpResponse::from_error(error);
                    merge_headers(response.headers_mut(), &headers);
                    Err(actix_web::error::InternalError::from_response(message, response).into())
                }
            }
        })
    }
}

/// Resolve the quota identifier for a request: authenticated user first,
/// then forwarded/direct address headers.
fn resolve_identifier(req: &ServiceRequest) -> Identifier {
    let authenticated = req
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|user| user.id.clone());
    let forwarded_for = header_string(req, "x-forwarded-for");
    let real_ip = header_string(req, "x-real-ip");

    Identifier::resolve(
        authenticated.as_deref(),
        forwarded_for.as_deref(),
        real_ip.as_deref(),
    )
}

fn header_string(req: &ServiceRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

fn merge_headers(map: &mut HeaderMap, headers: &RateLimitHeaders) {
    for (name, value) in headers.pairs() {
        if let Ok(value) = HeaderValue::from_str(value) {
            map.insert(HeaderName::from_static(name), value);
        }
    }
}

fn reject<B: 'static>(
    req: ServiceRequest,
    result: &GateDecision,
) -> ServiceResponse<EitherBody<B>> {
    let decision = result.decision;
    let retry_after = result.retry_after_secs();
    let headers = RateLimitHeaders::rejected(decision.limit, decision.reset_at, retry_after);
    let body = RateLimitExceeded::new(decision.limit, decision.reset_at, retry_after);

    let mut builder = HttpResponse::TooManyRequests();
    for (name, value) in headers.pairs() {
        builder.insert_header((name, value));
    }
    let response = builder.json(body);

    let (http_req, _payload) = req.into_parts();
    ServiceResponse::new(http_req, response).map_into_right_body()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use actix_web::{App, test, web};
    use quota_core::{PolicyRegistry, RateLimitPolicy, SharedStoreHealth};
    use quota_infra::{AvailabilityMonitor, LocalCounterStore};

    use crate::middleware::AuthContextMiddleware;

    use super::*;

    fn test_gate(max: u32) -> Arc<AdmissionGate> {
        let mut registry = PolicyRegistry::empty();
        registry.register("test", RateLimitPolicy::new(max, Duration::from_secs(60)));
        Arc::new(AdmissionGate::new(
            registry,
            Arc::new(LocalCounterStore::new()),
            None,
            AvailabilityMonitor::new(SharedStoreHealth::new()),
        ))
    }

    async fn counting_handler(hits: web::Data<AtomicUsize>) -> HttpResponse {
        hits.fetch_add(1, Ordering::SeqCst);
        HttpResponse::Ok().body("ok")
    }

    #[actix_web::test]
    async fn accepted_responses_carry_quota_headers() {
        let hits = web::Data::new(AtomicUsize::new(0));
        let app = test::init_service(
            App::new()
                .app_data(hits.clone())
                .wrap(RateLimitMiddleware::new(test_gate(2), "test"))
                .wrap(AuthContextMiddleware)
                .route("/", web::get().to(counting_handler)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header(("X-User-Id", "42"))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert!(res.status().is_success());
        assert_eq!(res.headers().get("x-ratelimit-limit").unwrap(), "2");
        assert_eq!(res.headers().get("x-ratelimit-remaining").unwrap(), "1");
        assert!(res.headers().contains_key("x-ratelimit-reset"));
        assert!(!res.headers().contains_key("retry-after"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn exhausted_quota_returns_429_and_skips_the_handler() {
        let hits = web::Data::new(AtomicUsize::new(0));
        let app = test::init_service(
            App::new()
                .app_data(hits.clone())
                .wrap(RateLimitMiddleware::new(test_gate(2), "test"))
                .route("/", web::get().to(counting_handler)),
        )
        .await;

        for _ in 0..2 {
            let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
            assert!(res.status().is_success());
        }

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(res.status(), actix_web::http::StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers().get("x-ratelimit-remaining").unwrap(), "0");

        let retry_after: u64 = res
            .headers()
            .get("retry-after")
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=61).contains(&retry_after));

        // The handler ran only for the two admitted requests.
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["error"], "Rate limit exceeded");
        assert_eq!(body["limit"], 2);
        assert_eq!(body["remaining"], 0);
        assert!(body["reset"].as_u64().unwrap() > 0);
    }

    #[actix_web::test]
    async fn identities_do_not_share_quota() {
        let hits = web::Data::new(AtomicUsize::new(0));
        let app = test::init_service(
            App::new()
                .app_data(hits.clone())
                .wrap(RateLimitMiddleware::new(test_gate(1), "test"))
                .wrap(AuthContextMiddleware)
                .route("/", web::get().to(counting_handler)),
        )
        .await;

        let first = |id: &str| {
            test::TestRequest::get()
                .uri("/")
                .insert_header(("X-User-Id", id.to_string()))
                .to_request()
        };

        assert!(test::call_service(&app, first("42")).await.status().is_success());
        // user:42 exhausted, user:43 untouched.
        assert_eq!(
            test::call_service(&app, first("42")).await.status(),
            actix_web::http::StatusCode::TOO_MANY_REQUESTS
        );
        assert!(test::call_service(&app, first("43")).await.status().is_success());
    }

    #[actix_web::test]
    async fn unknown_class_is_a_server_error() {
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(test_gate(2), "unregistered"))
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(
            res.status(),
            actix_web::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn failing_handler_still_gets_quota_headers() {
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(test_gate(2), "test"))
                .route(
                    "/",
                    web::get().to(|| async {
                        Err::<HttpResponse, _>(actix_web::error::ErrorBadRequest("nope"))
                    }),
                ),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(res.status(), actix_web::http::StatusCode::BAD_REQUEST);
        assert_eq!(res.headers().get("x-ratelimit-limit").unwrap(), "2");
        assert_eq!(res.headers().get("x-ratelimit-remaining").unwrap(), "1");
    }
}
