use actix_multipart::form::bytes::Bytes as UploadBytes;
use actix_multipart::form::text::Text;
use actix_multipart::form::MultipartForm;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::cores::jobs::fetcher::encode_base64;
use crate::errors::GatewayError;

pub const MAX_REFERENCE_IMAGES: usize = 8;
pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/jpg", "image/webp"];
pub const DEFAULT_CREATURE_NAME: &str = "UnknownCreature";
pub const DEFAULT_PROMPT_LABEL: &str = "image";

// Reject missing or whitespace-only required strings.
pub fn require_text(field: &str, value: &str) -> Result<String, GatewayError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(GatewayError::Validation(format!("Invalid request: '{}' is a required field", field)));
    }
    Ok(value.to_string())
}

// Optional strings that are absent or blank take the default.
fn text_or(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

// WIDTHxHEIGHT, digits only.
pub fn validate_size(size: &str) -> Result<(), GatewayError> {
    let valid = match size.split_once('x') {
        Some((width, height)) => {
            !width.is_empty()
                && !height.is_empty()
                && width.chars().all(|c| c.is_ascii_digit())
                && height.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(GatewayError::Unprocessable(
            "The 'size' parameter must have the format WIDTHxHEIGHT, e.g. 1024x1024".into(),
        ))
    }
}

// ------------------------------------------ OpenAI Images API ------------------------------------------
#[derive(Deserialize, Serialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    High,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::High => "high",
        }
    }

    pub fn parse(value: &str) -> Result<Quality, GatewayError> {
        match value.trim() {
            "low" => Ok(Quality::Low),
            "high" => Ok(Quality::High),
            other => Err(GatewayError::Validation(format!("Invalid quality '{}', expected 'low' or 'high'", other))),
        }
    }
}

#[derive(Deserialize, Serialize, ToSchema, Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,              // (Required) Text describing the image to generate.
    pub size: String,                // (Required) WIDTHxHEIGHT, e.g. 1024x1024.
    pub quality: Quality,            // (Required) low or high.
}

impl ImageRequest {
    pub fn validate(&self) -> Result<(), GatewayError> {
        require_text("prompt", &self.prompt)?;
        validate_size(&self.size)
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ImageResponse {
    pub image_b64: String,
    pub content_type: String,
    pub saved_path: String,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct DownloadQuery {
    #[serde(default)]
    pub download: bool,              // Return the saved file as an attachment instead of JSON.
}

#[derive(MultipartForm)]
pub struct ImageEditForm {
    pub prompt: Text<String>,
    pub size: Text<String>,
    pub quality: Text<String>,
    pub images: Vec<UploadBytes>,    // 1-8 reference images.
}

#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pub data: Bytes,
    pub file_name: String,
    pub content_type: String,
}

impl ReferenceImage {
    fn from_upload(upload: UploadBytes) -> Self {
        ReferenceImage {
            content_type: upload.content_type.as_ref().map(|m| m.essence_str().to_string()).unwrap_or_default(),
            file_name: upload.file_name.unwrap_or_default(),
            data: upload.data,
        }
    }
}

pub fn validate_uploads(images: &[ReferenceImage]) -> Result<(), GatewayError> {
    if images.is_empty() {
        return Err(GatewayError::Validation(format!("Send between 1 and {} images in 'images'", MAX_REFERENCE_IMAGES)));
    }
    if images.len() > MAX_REFERENCE_IMAGES {
        return Err(GatewayError::Validation(format!("At most {} reference images are allowed", MAX_REFERENCE_IMAGES)));
    }
    for image in images {
        if !ALLOWED_IMAGE_TYPES.contains(&image.content_type.as_str()) {
            return Err(GatewayError::Validation(format!("Unsupported image type: {}", image.content_type)));
        }
        if image.data.is_empty() {
            return Err(GatewayError::Validation(format!("Empty image file: {}", image.file_name)));
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ImageEdit {
    pub prompt: String,
    pub size: String,
    pub quality: Quality,
    pub images: Vec<ReferenceImage>,
}

impl ImageEdit {
    pub fn from_form(form: ImageEditForm) -> Result<ImageEdit, GatewayError> {
        let prompt = require_text("prompt", &form.prompt)?;
        let size = form.size.into_inner();
        validate_size(&size)?;
        let quality = Quality::parse(&form.quality)?;
        let images: Vec<ReferenceImage> = form.images.into_iter().map(ReferenceImage::from_upload).collect();
        validate_uploads(&images)?;
        Ok(ImageEdit { prompt, size, quality, images })
    }
}

// ------------------------------------------ BFL Kontext API ------------------------------------------
#[derive(Deserialize, Serialize, ToSchema, Debug, Clone)]
pub struct KontextRequest {
    pub prompt: String,                  // (Required) Text describing the edit.
    pub image_base64: String,            // (Required) Base64 image, may carry a data:image/... prefix.
    pub creature_name: Option<String>,   // Groups saved images, defaults to UnknownCreature.
    pub prompt_label: Option<String>,    // Base name of the saved file, defaults to image.
}

impl KontextRequest {
    // Trimmed copy with defaults applied.
    pub fn validated(self) -> Result<KontextRequest, GatewayError> {
        Ok(KontextRequest {
            prompt: require_text("prompt", &self.prompt)?,
            image_base64: require_text("image_base64", &self.image_base64)?,
            creature_name: Some(text_or(self.creature_name, DEFAULT_CREATURE_NAME)),
            prompt_label: Some(text_or(self.prompt_label, DEFAULT_PROMPT_LABEL)),
        })
    }

    pub fn creature_name(&self) -> &str {
        self.creature_name.as_deref().unwrap_or(DEFAULT_CREATURE_NAME)
    }

    pub fn prompt_label(&self) -> &str {
        self.prompt_label.as_deref().unwrap_or(DEFAULT_PROMPT_LABEL)
    }
}

#[derive(MultipartForm)]
pub struct KontextFileForm {
    pub prompt: Text<String>,
    pub image_file: UploadBytes,
    pub creature_name: Option<Text<String>>,
    pub prompt_label: Option<Text<String>>,
}

impl KontextFileForm {
    // Uploaded bytes are re-encoded as plain base64, no data: prefix.
    pub fn into_request(self) -> Result<KontextRequest, GatewayError> {
        if self.image_file.data.is_empty() {
            return Err(GatewayError::Validation("Empty image file".into()));
        }
        KontextRequest {
            prompt: self.prompt.into_inner(),
            image_base64: encode_base64(&self.image_file.data),
            creature_name: self.creature_name.map(Text::into_inner),
            prompt_label: self.prompt_label.map(Text::into_inner),
        }
        .validated()
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct KontextResponse {
    pub result_image_url: String,
    pub saved_path: String,
}

// ------------------------------------------ Runware API ------------------------------------------
#[derive(Deserialize, Serialize, ToSchema, Debug, Clone)]
pub struct RunwareRequest {
    pub prompt: String,              // (Required) Text describing the image to generate.
    pub model: Option<String>,       // Runware model, e.g. 'rundiffusion:130@100'.
}

impl RunwareRequest {
    pub fn validate(&self) -> Result<(), GatewayError> {
        require_text("prompt", &self.prompt).map(|_| ())
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct RunwareResponse {
    pub image_url: String,
    pub saved_path: String,
}

// ------------------------------------------ Gemini API ------------------------------------------
#[derive(Deserialize, Serialize, ToSchema, Debug, Clone)]
pub struct GeminiRequest {
    pub system_prompt: String,       // (Required) System instructions for the agent.
    pub user_prompt: String,         // (Required) User message.
}

impl GeminiRequest {
    pub fn validate(&self) -> Result<(), GatewayError> {
        require_text("system_prompt", &self.system_prompt)?;
        require_text("user_prompt", &self.user_prompt)?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct GeminiResponse {
    pub output_text: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(content_type: &str, data: &'static [u8]) -> ReferenceImage {
        ReferenceImage {
            data: Bytes::from_static(data),
            file_name: "ref.png".into(),
            content_type: content_type.into(),
        }
    }

    #[test]
    fn test_validate_size() {
        assert!(validate_size("1024x1024").is_ok());
        assert!(validate_size("256x512").is_ok());
        for bad in ["1024", "x1024", "1024x", "10a4x1024", "1024X1024", "1024x1024x2", ""] {
            let err = validate_size(bad).unwrap_err();
            assert!(matches!(err, GatewayError::Unprocessable(_)), "size {:?}", bad);
        }
    }

    #[test]
    fn test_validate_uploads_count_and_type() {
        assert!(validate_uploads(&[]).is_err());
        assert!(validate_uploads(&[reference("image/png", b"1")]).is_ok());
        assert!(validate_uploads(&vec![reference("image/webp", b"1"); 8]).is_ok());
        assert!(validate_uploads(&vec![reference("image/webp", b"1"); 9]).is_err());

        let err = validate_uploads(&[reference("image/gif", b"1")]).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported image type: image/gif");
        assert!(validate_uploads(&[reference("image/jpeg", b"")]).is_err());
    }

    #[test]
    fn test_kontext_request_defaults_and_trim() {
        let request = KontextRequest {
            prompt: "  add a hat ".into(),
            image_base64: "aGVsbG8=".into(),
            creature_name: None,
            prompt_label: None,
        }
        .validated()
        .unwrap();
        assert_eq!(request.prompt, "add a hat");
        assert_eq!(request.creature_name(), "UnknownCreature");
        assert_eq!(request.prompt_label(), "image");

        let missing = KontextRequest {
            prompt: "   ".into(),
            image_base64: "aGVsbG8=".into(),
            creature_name: None,
            prompt_label: None,
        };
        assert!(matches!(missing.validated(), Err(GatewayError::Validation(_))));
    }

    #[test]
    fn test_quality_parse() {
        assert_eq!(Quality::parse("high").unwrap(), Quality::High);
        assert!(Quality::parse("medium").is_err());
    }
}
