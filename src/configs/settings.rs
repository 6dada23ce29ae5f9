use serde::Deserialize;
use std::fs::{self, metadata};
use std::time::Duration;

use crate::errors::GatewayError;

// ---------------------------------------------- Provider Config ----------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAI,
    Gemini,
    Bfl,
    Runware,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Bfl => "bfl",
            ProviderKind::Runware => "runware",
        }
    }

    pub fn env_key(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "OPENAI_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::Bfl => "BFL_API_KEY",
            ProviderKind::Runware => "RUNWARE_API_KEY",
        }
    }
}

// Endpoint and model fall back to each provider's public defaults when unset.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

impl ProviderConfig {
    pub fn endpoint_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.endpoint.as_deref().filter(|e| !e.is_empty()).unwrap_or(default)
    }

    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.model.as_deref().filter(|m| !m.is_empty()).unwrap_or(default)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Providers {
    pub openai: ProviderConfig,
    pub gemini: ProviderConfig,
    pub bfl: ProviderConfig,
    pub runware: ProviderConfig,
}

impl Providers {
    pub fn get(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::OpenAI => &self.openai,
            ProviderKind::Gemini => &self.gemini,
            ProviderKind::Bfl => &self.bfl,
            ProviderKind::Runware => &self.runware,
        }
    }

    fn get_mut(&mut self, kind: ProviderKind) -> &mut ProviderConfig {
        match kind {
            ProviderKind::OpenAI => &mut self.openai,
            ProviderKind::Gemini => &mut self.gemini,
            ProviderKind::Bfl => &mut self.bfl,
            ProviderKind::Runware => &mut self.runware,
        }
    }
}

// ---------------------------------------------- Config ----------------------------------------------
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub output_dir: String,
    pub submit_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    pub poll_error_budget: u32,
    pub max_upload_bytes: usize,
    pub rate_limit_enabled: bool,
    pub rate_limit_tps: usize,
    pub rate_limit_bucket_capacity: usize,
    pub rate_limit_refill_interval: u64,
    pub access_keys: Vec<String>,
    pub server_cert_file: Option<String>,
    pub key_file: Option<String>,
    pub providers: Providers,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: 8000,
            output_dir: "generated".to_string(),
            submit_timeout_secs: 60,
            download_timeout_secs: 120,
            poll_interval_ms: 3000,
            max_poll_attempts: 20,
            poll_error_budget: 0,
            max_upload_bytes: 25 * 1024 * 1024,
            rate_limit_enabled: false,
            rate_limit_tps: 100,
            rate_limit_bucket_capacity: 200,
            rate_limit_refill_interval: 1000,
            access_keys: Vec::new(),
            server_cert_file: None,
            key_file: None,
            providers: Providers::default(),
        }
    }
}

const PROVIDERS: [ProviderKind; 4] = [
    ProviderKind::OpenAI,
    ProviderKind::Gemini,
    ProviderKind::Bfl,
    ProviderKind::Runware,
];

impl Config {
    // Built once at process start; handlers receive it through AppState.
    pub fn load() -> Result<Config, Box<dyn std::error::Error>> {
        // .env is optional
        let _ = dotenvy::dotenv();

        let config_path = match std::env::var("IMGGATE_CONFIG") {
            Ok(path) => Some(path),
            Err(_) if metadata("/etc/imggate/configs.yaml").is_ok() => Some("/etc/imggate/configs.yaml".to_string()),
            Err(_) if metadata("src/configs/configs.yaml").is_ok() => Some("src/configs/configs.yaml".to_string()),
            Err(_) => None,
        };

        let mut config = match config_path {
            Some(path) => Config::from_yaml(&fs::read_to_string(&path)?)?,
            None => Config::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Config, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    // Environment values win over the file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for kind in PROVIDERS {
            if let Some(key) = lookup(kind.env_key()).filter(|k| !k.trim().is_empty()) {
                self.providers.get_mut(kind).api_key = Some(key.trim().to_string());
            }
        }
        if let Some(dir) = lookup("IMAGE_OUTPUT_DIR").filter(|d| !d.is_empty()) {
            self.output_dir = dir;
        }
        if let Some(port) = lookup("IMGGATE_PORT").and_then(|p| p.parse().ok()) {
            self.port = port;
        }
    }

    pub fn require_key(&self, kind: ProviderKind) -> Result<String, GatewayError> {
        self.providers
            .get(kind)
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| GatewayError::Configuration(format!("Missing {} in environment variables", kind.env_key())))
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("port: 9001\nproviders:\n  bfl:\n    endpoint: http://localhost/bfl\n").unwrap();
        assert_eq!(config.port, 9001);
        assert_eq!(config.max_poll_attempts, 20);
        assert_eq!(config.poll_interval(), Duration::from_secs(3));
        assert_eq!(config.providers.bfl.endpoint_or("x"), "http://localhost/bfl");
        assert_eq!(config.providers.runware.endpoint_or("default"), "default");
    }

    #[test]
    fn test_env_overrides_keys_and_output_dir() {
        let env: HashMap<&str, &str> = [("BFL_API_KEY", " secret "), ("IMAGE_OUTPUT_DIR", "/tmp/out"), ("OPENAI_API_KEY", "")]
            .into_iter()
            .collect();
        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.require_key(ProviderKind::Bfl).unwrap(), "secret");
        assert_eq!(config.output_dir, "/tmp/out");
        assert!(config.require_key(ProviderKind::OpenAI).is_err());
    }

    #[test]
    fn test_missing_key_names_the_variable() {
        let err = Config::default().require_key(ProviderKind::Runware).unwrap_err();
        assert_eq!(err.to_string(), "Missing RUNWARE_API_KEY in environment variables");
    }
}
