use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};

use crate::apis::images_api::schemas::GeminiRequest;
use crate::configs::settings::ProviderKind;
use crate::cores::jobs::client::Submission;
use crate::cores::state::AppState;
use crate::errors::GatewayError;

pub const GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

pub struct Gemini;

impl Gemini {
    pub fn submission(endpoint: &str, api_key: &str, request: &GeminiRequest) -> Result<Submission, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|_| GatewayError::Configuration("GEMINI_API_KEY contains invalid header characters".into()))?,
        );

        Ok(Submission {
            endpoint: endpoint.to_string(),
            payload: json!({
                "contents": [{
                    "role": "user",
                    "parts": [{ "text": request.user_prompt }],
                }],
                "systemInstruction": {
                    "parts": [{ "text": request.system_prompt }],
                },
            }),
            headers,
        })
    }

    pub async fn generate_text(&self, state: &AppState, request: &GeminiRequest) -> Result<String, GatewayError> {
        let api_key = state.config.require_key(ProviderKind::Gemini)?;
        let endpoint = state.config.providers.gemini.endpoint_or(GEMINI_ENDPOINT);
        let submission = Gemini::submission(endpoint, &api_key, request)?;

        let body = state.job_client(ProviderKind::Gemini).call(submission).await?;
        Ok(extract_text(&body))
    }
}

// Join the text parts of the first candidate. Anything unexpected yields "".
pub fn extract_text(body: &Value) -> String {
    let parts = match body.pointer("/candidates/0/content/parts").and_then(Value::as_array) {
        Some(parts) => parts,
        None => return String::new(),
    };
    parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
