use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::StatusCode,
    Error, HttpRequest,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use log::Level;

use crate::utils::log::format_request_line;

pub struct RequestLog {
    pub target: &'static str,
    pub level: Level,
    pub line: String,
}

// Server errors with a cause go to error_log, every other outcome to access_log
pub fn request_log(req: &HttpRequest, status: StatusCode, error: Option<&Error>) -> RequestLog {
    match error {
        Some(err) if status.is_server_error() => RequestLog {
            target: "error_log",
            level: Level::Error,
            line: format_request_line(req, status.as_u16(), Some(&err.to_string())),
        },
        _ => RequestLog {
            target: "access_log",
            level: Level::Info,
            line: format_request_line(req, status.as_u16(), None),
        },
    }
}

// Wrap last so requests rejected by inner middleware are recorded too
pub struct AccessLog;

impl<S, B> Transform<S, ServiceRequest> for AccessLog
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AccessLogMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AccessLogMiddleware { service })
    }
}

pub struct AccessLogMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AccessLogMiddleware<S>
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
        let http_req = req.request().clone();
        let fut = self.service.call(req);

        Box::pin(async move {
            let result = fut.await;
            let entry = match &result {
                Ok(res) => request_log(res.request(), res.status(), res.response().error()),
                // Rejected before a response was built
                Err(err) => request_log(&http_req, err.as_response_error().status_code(), Some(err)),
            };
            log::log!(target: entry.target, entry.level, "{}", entry.line);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GatewayError;
    use crate::middleware::api_key::ApiKeyCheck;
    use actix_web::{test, web, App, HttpResponse};
    use std::sync::Arc;

    #[::core::prelude::v1::test]
    fn test_rejections_go_to_access_log() {
        let req = test::TestRequest::post().uri("/runware/generate").to_http_request();
        let err: Error = GatewayError::Unauthorized.into();

        let entry = request_log(&req, StatusCode::UNAUTHORIZED, Some(&err));
        assert_eq!(entry.target, "access_log");
        assert_eq!(entry.level, Level::Info);
        assert!(entry.line.contains("\"POST /runware/generate HTTP/1.1\" 401"));
    }

    #[::core::prelude::v1::test]
    fn test_server_errors_go_to_error_log() {
        let req = test::TestRequest::post().uri("/bfl/flux-kontext").to_http_request();
        let err: Error = GatewayError::Download("status 404".into()).into();

        let entry = request_log(&req, StatusCode::BAD_GATEWAY, Some(&err));
        assert_eq!(entry.target, "error_log");
        assert_eq!(entry.level, Level::Error);
        assert!(entry.line.ends_with("\"Failed to download the generated image: status 404\""), "{}", entry.line);
    }

    #[actix_rt::test]
    async fn test_outermost_log_passes_rejections_through() {
        let app = test::init_service(
            App::new()
                .wrap(ApiKeyCheck::new(Arc::new(vec!["secret".to_string()])))
                .wrap(AccessLog)
                .route("/runware/generate", web::post().to(HttpResponse::Ok)),
        )
        .await;

        let denied = app.call(test::TestRequest::post().uri("/runware/generate").to_request()).await;
        let err = denied.err().expect("request without key must be rejected");
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
    }
}
