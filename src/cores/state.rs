use reqwest::Client;

use crate::configs::settings::{Config, ProviderKind};
use crate::cores::jobs::client::JobClient;
use crate::cores::jobs::fetcher::ArtifactFetcher;
use crate::cores::jobs::persister::ArtifactStore;
use crate::cores::jobs::schemas::PollSettings;
use crate::errors::GatewayError;

// Process-wide, read-only state handed to every handler through web::Data.
pub struct AppState {
    pub config: Config,
    http: Client,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| GatewayError::Configuration(format!("Failed to build HTTP client: {}", err)))?;
        Ok(AppState { config, http })
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn job_client(&self, kind: ProviderKind) -> JobClient {
        JobClient::new(self.http.clone(), kind.name(), self.config.submit_timeout())
    }

    pub fn fetcher(&self) -> ArtifactFetcher {
        ArtifactFetcher::new(self.http.clone(), self.config.download_timeout())
    }

    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.config.output_dir)
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: self.config.poll_interval(),
            max_attempts: self.config.max_poll_attempts.max(1),
            error_budget: self.config.poll_error_budget,
        }
    }
}
