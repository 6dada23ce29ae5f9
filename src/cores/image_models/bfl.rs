use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::{json, Value};

use crate::apis::images_api::schemas::{KontextRequest, DEFAULT_CREATURE_NAME};
use crate::configs::settings::ProviderKind;
use crate::cores::image_models::image_controller::ImageProvider;
use crate::cores::jobs::client::Submission;
use crate::cores::jobs::fetcher::strip_data_url;
use crate::cores::jobs::persister::sanitize_or;
use crate::cores::jobs::pipeline::{AsyncJobPipeline, Destination, JobProtocol};
use crate::cores::jobs::schemas::{GeneratedArtifact, JobHandle, JobStatus};
use crate::cores::state::AppState;
use crate::errors::GatewayError;

pub const BFL_API_URL: &str = "https://api.bfl.ai/v1/flux-kontext-pro";

const STATUS_READY: &str = "Ready";
// Terminal failures; every other status value means the job is still queued or running.
const FAILED_STATUSES: [&str; 5] = ["Failed", "Error", "Content Moderated", "Request Moderated", "Task not found"];

fn key_header(api_key: &str) -> Result<HeaderValue, GatewayError> {
    HeaderValue::from_str(api_key)
        .map_err(|_| GatewayError::Configuration("BFL_API_KEY contains invalid header characters".into()))
}

// Status-field mapping for the BFL job queue.
pub struct KontextJob {
    api_key: String,
}

impl KontextJob {
    pub fn new(api_key: String) -> Self {
        KontextJob { api_key }
    }

    pub fn submission(&self, endpoint: &str, request: &KontextRequest) -> Result<Submission, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert("x-key", key_header(&self.api_key)?);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Submission {
            endpoint: endpoint.to_string(),
            payload: json!({
                "prompt": request.prompt,
                "input_image": strip_data_url(&request.image_base64),
                "safety_tolerance": 2,
                "output_format": "png",
                "prompt_upsampling": false,
            }),
            headers,
        })
    }
}

impl JobProtocol for KontextJob {
    fn provider(&self) -> &'static str {
        ProviderKind::Bfl.name()
    }

    fn job_handle(&self, body: &Value) -> Option<JobHandle> {
        let polling_url = body.get("polling_url")?.as_str().filter(|url| !url.is_empty())?;
        let id = body.get("id").and_then(Value::as_str).map(str::to_string);
        Some(JobHandle::new(id, polling_url))
    }

    fn status_headers(&self) -> Result<HeaderMap, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert("x-key", key_header(&self.api_key)?);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn classify(&self, body: &Value) -> Result<JobStatus, GatewayError> {
        let status = body.get("status").and_then(Value::as_str).unwrap_or_default();

        if status == STATUS_READY {
            return body
                .pointer("/result/sample")
                .and_then(Value::as_str)
                .filter(|url| !url.is_empty())
                .map(|url| JobStatus::Ready(url.to_string()))
                .ok_or_else(|| GatewayError::malformed(self.provider(), "job is Ready but has no image URL", body.clone()));
        }

        if FAILED_STATUSES.contains(&status) {
            let reason = body
                .get("details")
                .filter(|details| !details.is_null())
                .cloned()
                .unwrap_or_else(|| body.clone());
            return Ok(JobStatus::Failed(json!({ "status": status, "details": reason })));
        }

        Ok(JobStatus::Pending)
    }
}

pub struct BflKontext;

// Directory under bfl/; a name that sanitizes to nothing uses the default creature.
pub fn creature_segment(request: &KontextRequest) -> String {
    sanitize_or(request.creature_name(), DEFAULT_CREATURE_NAME)
}

#[async_trait]
impl ImageProvider for BflKontext {
    type Request = KontextRequest;

    async fn generate_or_edit(&self, state: &AppState, request: KontextRequest) -> Result<GeneratedArtifact, GatewayError> {
        // 1. Credentials are checked before any network call
        let api_key = state.config.require_key(ProviderKind::Bfl)?;
        let endpoint = state.config.providers.bfl.endpoint_or(BFL_API_URL);

        // 2. Build the job submission
        let job = KontextJob::new(api_key);
        let submission = job.submission(endpoint, &request)?;

        // 3. Submit, poll, download and save under bfl/{creature}
        let pipeline = AsyncJobPipeline::new(
            job,
            state.http().clone(),
            state.config.submit_timeout(),
            state.poll_settings(),
            state.fetcher(),
            state.store(),
        );
        let creature = creature_segment(&request);
        let destination = Destination {
            namespace: vec![ProviderKind::Bfl.name(), creature.as_str()],
            label: request.prompt_label().to_string(),
        };
        pipeline.run(submission, destination).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> KontextJob {
        KontextJob::new("test-key".into())
    }

    #[test]
    fn test_classify_statuses() {
        let job = job();
        assert_eq!(job.classify(&json!({"status": "Pending"})).unwrap(), JobStatus::Pending);
        assert_eq!(job.classify(&json!({"status": "Processing"})).unwrap(), JobStatus::Pending);
        assert_eq!(job.classify(&json!({})).unwrap(), JobStatus::Pending);
        assert_eq!(
            job.classify(&json!({"status": "Ready", "result": {"sample": "https://cdn/img.png"}})).unwrap(),
            JobStatus::Ready("https://cdn/img.png".into())
        );
    }

    #[test]
    fn test_classify_failures_carry_details() {
        let job = job();
        match job.classify(&json!({"status": "Error", "details": {"reason": "nsfw"}})).unwrap() {
            JobStatus::Failed(reason) => {
                assert_eq!(reason["status"], "Error");
                assert_eq!(reason["details"]["reason"], "nsfw");
            }
            other => panic!("unexpected status {:?}", other),
        }
        assert!(matches!(job.classify(&json!({"status": "Content Moderated"})).unwrap(), JobStatus::Failed(_)));
    }

    #[test]
    fn test_ready_without_sample_is_malformed() {
        let err = job().classify(&json!({"status": "Ready", "result": {}})).unwrap_err();
        assert_eq!(err.kind(), "malformed_response");
    }

    #[test]
    fn test_job_handle_requires_polling_url() {
        let job = job();
        let handle = job.job_handle(&json!({"id": "abc", "polling_url": "https://api.bfl.ai/v1/get_result?id=abc"})).unwrap();
        assert_eq!(handle.id.as_deref(), Some("abc"));
        assert_eq!(handle.poll_location, "https://api.bfl.ai/v1/get_result?id=abc");
        assert!(job.job_handle(&json!({"id": "abc"})).is_none());
    }

    #[test]
    fn test_submission_strips_data_prefix() {
        let request = KontextRequest {
            prompt: "add wings".into(),
            image_base64: "data:image/png;base64,aGVsbG8=".into(),
            creature_name: None,
            prompt_label: None,
        };
        let submission = job().submission(BFL_API_URL, &request).unwrap();
        assert_eq!(submission.payload["input_image"], "aGVsbG8=");
        assert_eq!(submission.payload["safety_tolerance"], 2);
        assert_eq!(submission.headers.get("x-key").unwrap(), "test-key");
    }

    #[test]
    fn test_creature_segment_falls_back_to_default() {
        for name in ["", "   ", "../..", "///"] {
            let request = KontextRequest {
                prompt: "add wings".into(),
                image_base64: "aGVsbG8=".into(),
                creature_name: Some(name.into()),
                prompt_label: None,
            }
            .validated()
            .unwrap();
            assert_eq!(creature_segment(&request), "UnknownCreature", "name {:?}", name);
        }
    }
}
