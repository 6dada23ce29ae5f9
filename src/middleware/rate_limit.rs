use actix_web::{dev::{Service, ServiceRequest, ServiceResponse, Transform}, Error};
use leaky_bucket::RateLimiter;
use std::{task::{Context, Poll}, time::Duration};
use std::sync::Arc;
use futures::future::{ok, LocalBoxFuture, Ready};

use crate::errors::GatewayError;

// Token-bucket rate limiting shared by every worker
#[derive(Clone)]
pub struct RateLimitMiddleware {
    enabled: bool,
    limiter: Arc<RateLimiter>,
}

impl RateLimitMiddleware {
    pub fn new(enabled: bool, rate_per_interval: usize, max_capacity: usize, interval: Duration) -> Self {
        let limiter = RateLimiter::builder()
            .initial(max_capacity)
            .refill(rate_per_interval)
            .max(max_capacity)
            .interval(interval)
            .fair(false)
            .build();

        Self {
            enabled,
            limiter: Arc::new(limiter),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RateLimitMiddlewareService {
            service,
            enabled: self.enabled,
            limiter: self.limiter.clone(),
        })
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: S,
    enabled: bool,
    limiter: Arc<RateLimiter>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if self.enabled && !self.limiter.try_acquire(1) {
            return Box::pin(async { Err(GatewayError::RateLimited.into()) });
        }
        let fut = self.service.call(req);
        Box::pin(fut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};

    #[actix_rt::test]
    async fn test_rejects_when_bucket_is_empty() {
        let limiter = RateLimitMiddleware::new(true, 1, 1, Duration::from_secs(3600));
        let app = test::init_service(
            App::new()
                .wrap(limiter)
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let first = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(first.status().is_success());

        let second = app.call(test::TestRequest::get().uri("/").to_request()).await;
        let err = second.err().expect("second request must be limited");
        assert_eq!(err.as_response_error().status_code(), actix_web::http::StatusCode::TOO_MANY_REQUESTS);
    }

    #[actix_rt::test]
    async fn test_disabled_limiter_passes_everything() {
        let limiter = RateLimitMiddleware::new(false, 1, 1, Duration::from_secs(3600));
        let app = test::init_service(App::new().wrap(limiter).route("/", web::get().to(HttpResponse::Ok))).await;
        for _ in 0..3 {
            let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
            assert!(resp.status().is_success());
        }
    }
}
