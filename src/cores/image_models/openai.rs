use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::multipart;
use serde_json::{json, Value};

use crate::apis::images_api::schemas::{ImageEdit, ImageRequest};
use crate::configs::settings::ProviderKind;
use crate::cores::image_models::image_controller::ImageProvider;
use crate::cores::jobs::client::Submission;
use crate::cores::jobs::fetcher::decode_base64;
use crate::cores::jobs::persister::{extension_from_url, slugify, DEFAULT_EXTENSION};
use crate::cores::jobs::schemas::{ArtifactLocator, GeneratedArtifact};
use crate::cores::state::AppState;
use crate::errors::GatewayError;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1";

pub enum OpenAIImageRequest {
    Generate(ImageRequest),
    Edit(ImageEdit),
}

pub struct OpenAIImages;

impl OpenAIImages {
    fn auth_headers(api_key: &str) -> Result<HeaderMap, GatewayError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| GatewayError::Configuration("OPENAI_API_KEY contains invalid header characters".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    pub fn generation_payload(model: &str, request: &ImageRequest) -> Value {
        json!({
            "model": model,
            "prompt": request.prompt,
            "background": "transparent",
            "n": 1,
            "quality": request.quality.as_str(),
            "size": request.size,
            "moderation": "auto",
            "output_format": "png",
        })
    }

    // One `image[]` part per reference image, in upload order.
    pub fn edit_form(model: &str, edit: &ImageEdit) -> Result<multipart::Form, GatewayError> {
        let mut form = multipart::Form::new()
            .text("model", model.to_string())
            .text("prompt", edit.prompt.clone())
            .text("n", "1")
            .text("quality", edit.quality.as_str())
            .text("size", edit.size.clone());

        for (idx, image) in edit.images.iter().enumerate() {
            let file_name = format!("ref_{}{}", idx, extension_from_url(&image.file_name));
            let part = multipart::Part::bytes(image.data.to_vec())
                .file_name(file_name)
                .mime_str(&image.content_type)
                .map_err(|err| GatewayError::Validation(format!("Unsupported image type {}: {}", image.content_type, err)))?;
            form = form.part("image[]", part);
        }
        Ok(form)
    }

    pub fn first_b64(body: &Value) -> Option<String> {
        body.pointer("/data/0/b64_json")
            .and_then(Value::as_str)
            .filter(|b64| !b64.is_empty())
            .map(str::to_string)
    }
}

#[async_trait]
impl ImageProvider for OpenAIImages {
    type Request = OpenAIImageRequest;

    async fn generate_or_edit(&self, state: &AppState, request: OpenAIImageRequest) -> Result<GeneratedArtifact, GatewayError> {
        let provider = ProviderKind::OpenAI.name();
        let api_key = state.config.require_key(ProviderKind::OpenAI)?;
        let provider_config = &state.config.providers.openai;
        let base = provider_config.endpoint_or(OPENAI_API_BASE).trim_end_matches('/');
        let model = provider_config.model_or(DEFAULT_IMAGE_MODEL);
        let client = state.job_client(ProviderKind::OpenAI);
        let headers = Self::auth_headers(&api_key)?;

        // (body, namespace, label prefix, prompt)
        let (body, namespace, prefix, prompt) = match request {
            OpenAIImageRequest::Generate(generate) => {
                let submission = Submission {
                    endpoint: format!("{}/images/generations", base),
                    payload: Self::generation_payload(model, &generate),
                    headers,
                };
                (client.call(submission).await?, vec![], None, generate.prompt)
            }
            OpenAIImageRequest::Edit(edit) => {
                let form = Self::edit_form(model, &edit)?;
                let body = client.call_multipart(&format!("{}/images/edits", base), form, headers).await?;
                (body, vec!["edits"], Some("edit"), edit.prompt)
            }
        };

        let b64 = Self::first_b64(&body)
            .ok_or_else(|| GatewayError::malformed(provider, "response does not contain an image", Value::Null))?;
        let bytes = decode_base64(provider, &b64)?;

        let slug = slugify(&prompt, 40);
        let label = match (prefix, slug.is_empty()) {
            (Some(prefix), false) => format!("{}_{}", prefix, slug),
            (Some(prefix), true) => prefix.to_string(),
            (None, false) => slug,
            (None, true) => "image".to_string(),
        };
        let saved_path = state.store().save(&bytes, &namespace, &label, DEFAULT_EXTENSION).await?;

        Ok(GeneratedArtifact {
            locator: ArtifactLocator::Inline(b64),
            saved_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::images_api::schemas::Quality;

    #[test]
    fn test_generation_payload() {
        let request = ImageRequest { prompt: "a fox".into(), size: "1024x1024".into(), quality: Quality::Low };
        let payload = OpenAIImages::generation_payload(DEFAULT_IMAGE_MODEL, &request);
        assert_eq!(payload["model"], "gpt-image-1");
        assert_eq!(payload["quality"], "low");
        assert_eq!(payload["background"], "transparent");
        assert_eq!(payload["output_format"], "png");
    }

    #[test]
    fn test_first_b64() {
        assert_eq!(OpenAIImages::first_b64(&json!({"data": [{"b64_json": "aGk="}]})).as_deref(), Some("aGk="));
        assert!(OpenAIImages::first_b64(&json!({"data": []})).is_none());
    }
}
