use actix_multipart::form::MultipartForm;
use actix_web::{post, web, HttpResponse};

use crate::apis::images_api::schemas::{KontextFileForm, KontextRequest, KontextResponse};
use crate::apis::schemas::ErrorResponse;
use crate::cores::image_models::bfl::BflKontext;
use crate::cores::image_models::image_controller::ImageProvider;
use crate::cores::jobs::schemas::GeneratedArtifact;
use crate::cores::state::AppState;
use crate::errors::GatewayError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(flux_kontext).service(flux_kontext_file);
}

async fn run_kontext(state: &AppState, request: KontextRequest) -> Result<HttpResponse, GatewayError> {
    let artifact: GeneratedArtifact = BflKontext.generate_or_edit(state, request).await?;
    Ok(HttpResponse::Ok().json(KontextResponse {
        result_image_url: artifact.url().unwrap_or_default().to_string(),
        saved_path: artifact.saved_path_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/bfl/flux-kontext",
    request_body = KontextRequest,
    responses(
        (status = 200, body = KontextResponse),
        (status = 400, body = ErrorResponse),
        (status = 500, body = ErrorResponse),
        (status = 502, body = ErrorResponse),
        (status = 503, body = ErrorResponse),
    )
)]

// Submit a Kontext edit, wait for the job and save the result under bfl/{creature_name}.
#[post("/bfl/flux-kontext")]
pub async fn flux_kontext(
    state: web::Data<AppState>,
    req_body: web::Json<KontextRequest>,
) -> Result<HttpResponse, GatewayError> {
    let request = req_body.into_inner().validated()?;
    run_kontext(&state, request).await
}

#[utoipa::path(
    post,
    path = "/bfl/flux-kontext-file",
    responses(
        (status = 200, body = KontextResponse),
        (status = 400, body = ErrorResponse),
        (status = 500, body = ErrorResponse),
        (status = 502, body = ErrorResponse),
        (status = 503, body = ErrorResponse),
    )
)]

// Same as /bfl/flux-kontext with the image uploaded as multipart/form-data.
#[post("/bfl/flux-kontext-file")]
pub async fn flux_kontext_file(
    state: web::Data<AppState>,
    MultipartForm(form): MultipartForm<KontextFileForm>,
) -> Result<HttpResponse, GatewayError> {
    let request = form.into_request()?;
    run_kontext(&state, request).await
}
