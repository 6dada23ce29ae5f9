use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::errors::GatewayError;

// Downloads a finished artifact in a single attempt. The payload is held in memory.
#[derive(Clone)]
pub struct ArtifactFetcher {
    http: Client,
    timeout: Duration,
}

impl ArtifactFetcher {
    pub fn new(http: Client, timeout: Duration) -> Self {
        ArtifactFetcher { http, timeout }
    }

    pub async fn fetch(&self, url: &str) -> Result<Bytes, GatewayError> {
        let response = self.http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| GatewayError::Download(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Download(format!("status {}", status.as_u16())));
        }

        response.bytes().await.map_err(|err| GatewayError::Download(err.to_string()))
    }
}

/// Drops a `data:image/...;base64,` prefix if present.
pub fn strip_data_url(data: &str) -> &str {
    let data = data.trim();
    if data.starts_with("data:") {
        if let Some((_, payload)) = data.split_once(',') {
            return payload;
        }
    }
    data
}

// Decode an inline artifact returned in a provider response body
pub fn decode_base64(provider: &'static str, data: &str) -> Result<Vec<u8>, GatewayError> {
    BASE64
        .decode(strip_data_url(data))
        .map_err(|err| GatewayError::malformed(provider, format!("error decoding base64 image: {}", err), Value::Null))
}

pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_data_url() {
        assert_eq!(strip_data_url("data:image/png;base64,aGVsbG8="), "aGVsbG8=");
        assert_eq!(strip_data_url("  aGVsbG8= "), "aGVsbG8=");
        assert_eq!(strip_data_url("data:broken"), "data:broken");
    }

    #[test]
    fn test_decode_base64() {
        assert_eq!(decode_base64("openai", "data:image/png;base64,aGVsbG8=").unwrap(), b"hello");
        let err = decode_base64("openai", "***").unwrap_err();
        assert_eq!(err.kind(), "malformed_response");
    }
}
