use actix_multipart::form::MultipartForm;
use actix_web::http::header::ContentDisposition;
use actix_web::{post, web, HttpResponse};
use serde_json::Value;

use crate::apis::images_api::schemas::{DownloadQuery, ImageEdit, ImageEditForm, ImageRequest, ImageResponse};
use crate::apis::schemas::ErrorResponse;
use crate::configs::settings::ProviderKind;
use crate::cores::image_models::image_controller::ImageProvider;
use crate::cores::image_models::openai::{OpenAIImageRequest, OpenAIImages};
use crate::cores::jobs::schemas::{ArtifactLocator, GeneratedArtifact};
use crate::cores::state::AppState;
use crate::errors::GatewayError;

// Configure the actix_web service routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(generate_image).service(edit_image);
}

// JSON envelope, or the saved PNG itself when the caller asked to download it.
async fn image_response(artifact: GeneratedArtifact, download: bool) -> Result<HttpResponse, GatewayError> {
    if download {
        let bytes = tokio::fs::read(&artifact.saved_path)
            .await
            .map_err(|err| GatewayError::Persistence(format!("{:?}: {}", artifact.saved_path, err)))?;
        let filename = artifact
            .saved_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.png".to_string());
        return Ok(HttpResponse::Ok()
            .content_type("image/png")
            .insert_header(ContentDisposition::attachment(filename))
            .body(bytes));
    }

    let saved_path = artifact.saved_path_string();
    let image_b64 = match artifact.locator {
        ArtifactLocator::Inline(b64) => b64,
        ArtifactLocator::Url(url) => {
            return Err(GatewayError::malformed(
                ProviderKind::OpenAI.name(),
                "expected an inline image in the response",
                Value::String(url),
            ))
        }
    };
    Ok(HttpResponse::Ok().json(ImageResponse {
        image_b64,
        content_type: "image/png".to_string(),
        saved_path,
    }))
}

#[utoipa::path(
    post,
    path = "/image/generate",
    request_body = ImageRequest,
    params(DownloadQuery),
    responses(
        (status = 200, body = ImageResponse),
        (status = 400, body = ErrorResponse),
        (status = 422, body = ErrorResponse),
        (status = 500, body = ErrorResponse),
        (status = 502, body = ErrorResponse),
    )
)]

// Handle the POST request for /image/generate.
#[post("/image/generate")]
pub async fn generate_image(
    state: web::Data<AppState>,
    query: web::Query<DownloadQuery>,
    req_body: web::Json<ImageRequest>,
) -> Result<HttpResponse, GatewayError> {
    // 1. Validate the required fields.
    let request = req_body.into_inner();
    request.validate()?;

    // 2. Generate with the provider and save the image locally
    let artifact = OpenAIImages.generate_or_edit(&state, OpenAIImageRequest::Generate(request)).await?;

    // 3. Return base64 or the file itself
    image_response(artifact, query.download).await
}

#[utoipa::path(
    post,
    path = "/image/edit",
    params(DownloadQuery),
    responses(
        (status = 200, body = ImageResponse),
        (status = 400, body = ErrorResponse),
        (status = 422, body = ErrorResponse),
        (status = 500, body = ErrorResponse),
        (status = 502, body = ErrorResponse),
    )
)]

// Edit an image from 1-8 reference images sent as multipart/form-data.
#[post("/image/edit")]
pub async fn edit_image(
    state: web::Data<AppState>,
    query: web::Query<DownloadQuery>,
    MultipartForm(form): MultipartForm<ImageEditForm>,
) -> Result<HttpResponse, GatewayError> {
    let edit = ImageEdit::from_form(form)?;
    let artifact = OpenAIImages.generate_or_edit(&state, OpenAIImageRequest::Edit(edit)).await?;
    image_response(artifact, query.download).await
}
