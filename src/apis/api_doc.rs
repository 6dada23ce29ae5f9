use utoipa::OpenApi;

use crate::apis::images_api;
use crate::apis::images_api::schemas::{
    GeminiRequest, GeminiResponse, ImageRequest, ImageResponse, KontextRequest, KontextResponse,
    MessageResponse, Quality, RunwareRequest, RunwareResponse,
};
use crate::apis::root;
use crate::apis::schemas::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        root::root,
        root::ping,
        images_api::image::generate_image,
        images_api::image::edit_image,
        images_api::bfl::flux_kontext,
        images_api::bfl::flux_kontext_file,
        images_api::runware::generate_image,
        images_api::gemini::generate,
    ),
    components(
        schemas(ErrorResponse, MessageResponse, Quality, ImageRequest, ImageResponse, KontextRequest,
            KontextResponse, RunwareRequest, RunwareResponse, GeminiRequest, GeminiResponse)
    )
)]

pub struct ApiDoc;
