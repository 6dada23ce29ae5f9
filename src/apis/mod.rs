use actix_multipart::form::MultipartFormConfig;
use actix_web::web;

use crate::errors::GatewayError;

pub mod api_doc;
pub mod images_api;
pub mod root;
pub mod schemas;

// All gateway routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(root::configure)
        .configure(images_api::image::configure)
        .configure(images_api::bfl::configure)
        .configure(images_api::runware::configure)
        .configure(images_api::gemini::configure);
}

// Body parsing failures use the same error envelope as everything else.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| GatewayError::Validation(format!("Invalid request body: {}", err)).into())
}

pub fn multipart_config(max_upload_bytes: usize) -> MultipartFormConfig {
    MultipartFormConfig::default()
        .total_limit(max_upload_bytes)
        .memory_limit(max_upload_bytes)
        .error_handler(|err, _req| GatewayError::Validation(format!("Invalid multipart form: {}", err)).into())
}
