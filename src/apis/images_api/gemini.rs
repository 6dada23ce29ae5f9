use actix_web::{post, web, HttpResponse};

use crate::apis::images_api::schemas::{GeminiRequest, GeminiResponse};
use crate::apis::schemas::ErrorResponse;
use crate::cores::state::AppState;
use crate::cores::text_models::gemini::Gemini;
use crate::errors::GatewayError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(generate);
}

#[utoipa::path(
    post,
    path = "/gemini/generate",
    request_body = GeminiRequest,
    responses(
        (status = 200, body = GeminiResponse),
        (status = 400, body = ErrorResponse),
        (status = 500, body = ErrorResponse),
        (status = 502, body = ErrorResponse),
    )
)]

#[post("/gemini/generate")]
pub async fn generate(
    state: web::Data<AppState>,
    req_body: web::Json<GeminiRequest>,
) -> Result<HttpResponse, GatewayError> {
    req_body.validate()?;
    let output_text = Gemini.generate_text(&state, &req_body).await?;
    Ok(HttpResponse::Ok().json(GeminiResponse { output_text }))
}
