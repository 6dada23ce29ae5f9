use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::{json, Value};
use thiserror::Error;

use crate::apis::schemas::ErrorResponse;

// Every failure a route can surface. Each variant is rendered exactly once into
// an ErrorResponse envelope, so callers can debug without server-side logs.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Validation(String),

    // Input that parsed but has the wrong format (e.g. size not WIDTHxHEIGHT).
    #[error("{0}")]
    Unprocessable(String),

    #[error("Invalid or missing API key")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Network error calling {provider}: {message}")]
    Transport { provider: &'static str, message: String },

    #[error("{provider} rejected the request with status {status}")]
    Submission { provider: &'static str, status: u16, details: Value },

    #[error("{provider} status query failed with status {status}")]
    StatusQuery { provider: &'static str, status: u16, details: Value },

    #[error("Unexpected response from {provider}: {message}")]
    MalformedResponse { provider: &'static str, message: String, details: Value },

    #[error("{provider} reported the job as failed")]
    JobFailed { provider: &'static str, reason: Value },

    #[error("{provider} is still processing the job after {attempts} status checks, try again later")]
    PollingTimeout { provider: &'static str, job_id: Option<String>, attempts: u32 },

    #[error("Failed to download the generated image: {0}")]
    Download(String),

    #[error("Image generated but could not be saved locally: {0}")]
    Persistence(String),
}

impl GatewayError {
    pub fn transport(provider: &'static str, err: reqwest::Error) -> Self {
        GatewayError::Transport { provider, message: err.to_string() }
    }

    pub fn malformed(provider: &'static str, message: impl Into<String>, details: Value) -> Self {
        GatewayError::MalformedResponse { provider, message: message.into(), details }
    }

    // Only network-level failures qualify for the polling error budget.
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Transport { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Configuration(_) => "configuration",
            GatewayError::Validation(_) | GatewayError::Unprocessable(_) => "validation",
            GatewayError::Unauthorized => "unauthorized",
            GatewayError::RateLimited => "rate_limited",
            GatewayError::Transport { .. } => "transport",
            GatewayError::Submission { .. } => "submission",
            GatewayError::StatusQuery { .. } => "status_query",
            GatewayError::MalformedResponse { .. } => "malformed_response",
            GatewayError::JobFailed { .. } => "job_failed",
            GatewayError::PollingTimeout { .. } => "polling_timeout",
            GatewayError::Download(_) => "download",
            GatewayError::Persistence(_) => "persistence",
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            GatewayError::Submission { status, details, .. }
            | GatewayError::StatusQuery { status, details, .. } => {
                Some(json!({ "status": status, "error": details }))
            }
            GatewayError::MalformedResponse { details, .. } => Some(details.clone()),
            GatewayError::JobFailed { reason, .. } => Some(reason.clone()),
            GatewayError::PollingTimeout { job_id, attempts, .. } => Some(json!({
                "status": "Timeout",
                "request_id": job_id,
                "attempts": attempts,
            })),
            _ => None,
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Configuration(_) | GatewayError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::PollingTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Transport { .. }
            | GatewayError::Submission { .. }
            | GatewayError::StatusQuery { .. }
            | GatewayError::MalformedResponse { .. }
            | GatewayError::JobFailed { .. }
            | GatewayError::Download(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            kind: self.kind().to_string(),
            details: self.details(),
        })
    }
}
