use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::apis::images_api::schemas::RunwareRequest;
use crate::configs::settings::ProviderKind;
use crate::cores::image_models::image_controller::ImageProvider;
use crate::cores::jobs::client::Submission;
use crate::cores::jobs::persister::slugify;
use crate::cores::jobs::pipeline::{fetch_and_persist, Destination};
use crate::cores::jobs::schemas::GeneratedArtifact;
use crate::cores::state::AppState;
use crate::errors::GatewayError;

pub const RUNWARE_ENDPOINT: &str = "https://api.runware.ai/v1/generate";
pub const DEFAULT_RUNWARE_MODEL: &str = "rundiffusion:130@100";

pub struct Runware;

impl Runware {
    pub fn submission(endpoint: &str, api_key: &str, model: &str, request: &RunwareRequest) -> Result<Submission, GatewayError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| GatewayError::Configuration("RUNWARE_API_KEY contains invalid header characters".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // Runware takes a list of tasks, even for a single inference
        let payload = json!([{
            "taskType": "imageInference",
            "taskUUID": Uuid::new_v4().to_string(),
            "positivePrompt": request.prompt,
            "model": model,
            "outputType": "URL",
            "outputFormat": "PNG",
            "outputQuality": 95,
            "numberResults": 1,
            "includeCost": false,
            "width": 768,
            "height": 768,
        }]);

        Ok(Submission { endpoint: endpoint.to_string(), payload, headers })
    }

    pub fn image_url(body: &Value) -> Option<String> {
        body.pointer("/data/0/imageURL")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
    }
}

#[async_trait]
impl ImageProvider for Runware {
    type Request = RunwareRequest;

    async fn generate_or_edit(&self, state: &AppState, request: RunwareRequest) -> Result<GeneratedArtifact, GatewayError> {
        // 1. Resolve credentials and model
        let api_key = state.config.require_key(ProviderKind::Runware)?;
        let provider_config = &state.config.providers.runware;
        let model = request
            .model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| provider_config.model_or(DEFAULT_RUNWARE_MODEL));
        let submission = Runware::submission(provider_config.endpoint_or(RUNWARE_ENDPOINT), &api_key, model, &request)?;

        // 2. Single synchronous call, the response already carries the image URL
        let body = state.job_client(ProviderKind::Runware).call(submission).await?;
        let image_url = Runware::image_url(&body).ok_or_else(|| {
            let details = body.get("errors").cloned().unwrap_or_else(|| body.clone());
            GatewayError::malformed(ProviderKind::Runware.name(), "response does not contain 'imageURL'", details)
        })?;

        // 3. Download and save under runware/
        let slug = slugify(&request.prompt, 40);
        let label = if slug.is_empty() { "runware".to_string() } else { format!("runware_{}", slug) };
        let destination = Destination { namespace: vec![ProviderKind::Runware.name()], label };
        fetch_and_persist(&state.fetcher(), &state.store(), image_url, destination).await
    }
}
