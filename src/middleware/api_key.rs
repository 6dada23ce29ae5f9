use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use std::sync::Arc;

use crate::errors::GatewayError;
use crate::utils::check_access_key;

// Paths reachable without a gateway key
const OPEN_PATHS: [&str; 2] = ["/", "/ping"];
const OPEN_PREFIXES: [&str; 2] = ["/swagger-ui", "/api-docs"];

fn is_open_path(path: &str) -> bool {
    OPEN_PATHS.contains(&path) || OPEN_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

// Bearer check against the configured gateway keys, disabled when the list is empty
pub struct ApiKeyCheck {
    access_keys: Arc<Vec<String>>,
}

impl ApiKeyCheck {
    pub fn new(access_keys: Arc<Vec<String>>) -> Self {
        Self { access_keys }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyCheck
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ApiKeyCheckMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ApiKeyCheckMiddleware {
            service,
            access_keys: self.access_keys.clone(),
        })
    }
}

pub struct ApiKeyCheckMiddleware<S> {
    service: S,
    access_keys: Arc<Vec<String>>,
}

impl<S, B> Service<ServiceRequest> for ApiKeyCheckMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let allowed = self.access_keys.is_empty()
            || is_open_path(req.path())
            || check_access_key(req.headers(), &self.access_keys);

        if !allowed {
            return Box::pin(async { Err(GatewayError::Unauthorized.into()) });
        }
        Box::pin(self.service.call(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};

    #[actix_rt::test]
    async fn test_requires_key_except_open_paths() {
        let keys = Arc::new(vec!["secret".to_string()]);
        let app = test::init_service(
            App::new()
                .wrap(ApiKeyCheck::new(keys))
                .route("/ping", web::get().to(HttpResponse::Ok))
                .route("/runware/generate", web::post().to(HttpResponse::Ok)),
        )
        .await;

        let open = test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
        assert!(open.status().is_success());

        let denied = app.call(test::TestRequest::post().uri("/runware/generate").to_request()).await;
        let err = denied.err().expect("request without key must be rejected");
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/runware/generate")
            .insert_header(("Authorization", "Bearer secret"))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());
    }
}
