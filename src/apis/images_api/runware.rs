use actix_web::{post, web, HttpResponse};

use crate::apis::images_api::schemas::{RunwareRequest, RunwareResponse};
use crate::apis::schemas::ErrorResponse;
use crate::cores::image_models::image_controller::ImageProvider;
use crate::cores::image_models::runware::Runware;
use crate::cores::state::AppState;
use crate::errors::GatewayError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(generate_image);
}

#[utoipa::path(
    post,
    path = "/runware/generate",
    request_body = RunwareRequest,
    responses(
        (status = 200, body = RunwareResponse),
        (status = 400, body = ErrorResponse),
        (status = 500, body = ErrorResponse),
        (status = 502, body = ErrorResponse),
    )
)]

// Handle the POST request for /runware/generate.
#[post("/runware/generate")]
pub async fn generate_image(
    state: web::Data<AppState>,
    req_body: web::Json<RunwareRequest>,
) -> Result<HttpResponse, GatewayError> {
    // 1. Validate the required fields.
    let request = req_body.into_inner();
    request.validate()?;

    // 2. Call Runware, download and save the image
    let artifact = Runware.generate_or_edit(&state, request).await?;

    Ok(HttpResponse::Ok().json(RunwareResponse {
        image_url: artifact.url().unwrap_or_default().to_string(),
        saved_path: artifact.saved_path_string(),
    }))
}
