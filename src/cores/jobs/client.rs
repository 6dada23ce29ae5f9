use reqwest::header::HeaderMap;
use reqwest::{multipart, Client, Response};
use serde_json::Value;
use std::time::Duration;

use crate::cores::jobs::schemas::JobHandle;
use crate::errors::GatewayError;

// A provider request ready to be sent.
#[derive(Debug, Clone)]
pub struct Submission {
    pub endpoint: String,
    pub payload: Value,
    pub headers: HeaderMap,
}

// Issues the one outbound call that creates a job or produces a result. No retries.
#[derive(Clone)]
pub struct JobClient {
    http: Client,
    provider: &'static str,
    timeout: Duration,
}

impl JobClient {
    pub fn new(http: Client, provider: &'static str, timeout: Duration) -> Self {
        JobClient { http, provider, timeout }
    }

    // Submit an asynchronous job and extract its handle from the response body.
    pub async fn submit<F>(&self, submission: Submission, locate: F) -> Result<JobHandle, GatewayError>
    where
        F: FnOnce(&Value) -> Option<JobHandle>,
    {
        let body = self.call(submission).await?;
        locate(&body).ok_or_else(|| GatewayError::malformed(self.provider, "polling URL not received", body))
    }

    // Single JSON request/response call.
    pub async fn call(&self, submission: Submission) -> Result<Value, GatewayError> {
        let response = self.http
            .post(&submission.endpoint)
            .headers(submission.headers)
            .timeout(self.timeout)
            .json(&submission.payload)
            .send()
            .await
            .map_err(|err| GatewayError::transport(self.provider, err))?;
        self.read_json(response).await
    }

    pub async fn call_multipart(&self, endpoint: &str, form: multipart::Form, headers: HeaderMap) -> Result<Value, GatewayError> {
        let response = self.http
            .post(endpoint)
            .headers(headers)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|err| GatewayError::transport(self.provider, err))?;
        self.read_json(response).await
    }

    async fn read_json(&self, response: Response) -> Result<Value, GatewayError> {
        let status = response.status();
        let text = response.text().await.map_err(|err| GatewayError::transport(self.provider, err))?;
        if !status.is_success() {
            return Err(GatewayError::Submission {
                provider: self.provider,
                status: status.as_u16(),
                details: body_details(&text),
            });
        }
        serde_json::from_str(&text)
            .map_err(|err| GatewayError::malformed(self.provider, format!("invalid JSON body: {}", err), Value::String(text)))
    }
}

// Upstream bodies are echoed back as JSON when possible, otherwise as text.
pub fn body_details(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_details() {
        assert_eq!(body_details(r#"{"detail":"bad key"}"#), json!({"detail": "bad key"}));
        assert_eq!(body_details("Bad Gateway"), json!("Bad Gateway"));
    }
}
