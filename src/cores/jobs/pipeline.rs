use async_trait::async_trait;
use log::info;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::cores::jobs::client::{body_details, JobClient, Submission};
use crate::cores::jobs::fetcher::ArtifactFetcher;
use crate::cores::jobs::persister::{extension_from_url, ArtifactStore};
use crate::cores::jobs::poller::{await_completion, StatusProbe, TokioPause};
use crate::cores::jobs::schemas::{ArtifactLocator, GeneratedArtifact, JobHandle, JobStatus, PollSettings};
use crate::errors::GatewayError;

// What an asynchronous provider contributes: handle extraction and status-field mapping.
pub trait JobProtocol: Send + Sync {
    fn provider(&self) -> &'static str;
    fn job_handle(&self, body: &Value) -> Option<JobHandle>;
    fn status_headers(&self) -> Result<HeaderMap, GatewayError>;
    fn classify(&self, body: &Value) -> Result<JobStatus, GatewayError>;
}

// Status queries over HTTP GET against the handle's poll location.
pub struct HttpStatusProbe<'a, P: JobProtocol> {
    http: &'a Client,
    protocol: &'a P,
    headers: HeaderMap,
    timeout: Duration,
}

impl<'a, P: JobProtocol> HttpStatusProbe<'a, P> {
    pub fn new(http: &'a Client, protocol: &'a P, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(HttpStatusProbe {
            http,
            protocol,
            headers: protocol.status_headers()?,
            timeout,
        })
    }
}

#[async_trait]
impl<'a, P: JobProtocol> StatusProbe for HttpStatusProbe<'a, P> {
    fn provider(&self) -> &'static str {
        self.protocol.provider()
    }

    async fn status(&self, handle: &JobHandle) -> Result<JobStatus, GatewayError> {
        let provider = self.protocol.provider();
        let response = self.http
            .get(&handle.poll_location)
            .headers(self.headers.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| GatewayError::transport(provider, err))?;

        let status = response.status();
        let text = response.text().await.map_err(|err| GatewayError::transport(provider, err))?;
        if !status.is_success() {
            return Err(GatewayError::StatusQuery {
                provider,
                status: status.as_u16(),
                details: body_details(&text),
            });
        }

        let body: Value = serde_json::from_str(&text)
            .map_err(|_| GatewayError::malformed(provider, "invalid polling response", Value::String(text)))?;
        self.protocol.classify(&body)
    }
}

// Where and under which name an artifact is persisted.
#[derive(Debug, Clone)]
pub struct Destination<'a> {
    pub namespace: Vec<&'a str>,
    pub label: String,
}

/// submit -> poll until ready -> download -> persist, for any [`JobProtocol`].
/// One pipeline per inbound request; nothing here is shared between requests.
pub struct AsyncJobPipeline<P: JobProtocol> {
    protocol: P,
    client: JobClient,
    http: Client,
    poll: PollSettings,
    call_timeout: Duration,
    fetcher: ArtifactFetcher,
    store: ArtifactStore,
}

impl<P: JobProtocol> AsyncJobPipeline<P> {
    pub fn new(
        protocol: P,
        http: Client,
        call_timeout: Duration,
        poll: PollSettings,
        fetcher: ArtifactFetcher,
        store: ArtifactStore,
    ) -> Self {
        AsyncJobPipeline {
            client: JobClient::new(http.clone(), protocol.provider(), call_timeout),
            protocol,
            http,
            poll,
            call_timeout,
            fetcher,
            store,
        }
    }

    pub async fn run(&self, submission: Submission, destination: Destination<'_>) -> Result<GeneratedArtifact, GatewayError> {
        let provider = self.protocol.provider();
        let handle = self.client.submit(submission, |body| self.protocol.job_handle(body)).await?;
        info!("{} job {} submitted", provider, handle.id.as_deref().unwrap_or("-"));

        let probe = HttpStatusProbe::new(&self.http, &self.protocol, self.call_timeout)?;
        let url = await_completion(&probe, &handle, &self.poll, &TokioPause).await?;

        fetch_and_persist(&self.fetcher, &self.store, url, destination).await
    }
}

// Shared tail for every provider whose result is a downloadable URL.
pub async fn fetch_and_persist(
    fetcher: &ArtifactFetcher,
    store: &ArtifactStore,
    url: String,
    destination: Destination<'_>,
) -> Result<GeneratedArtifact, GatewayError> {
    let bytes = fetcher.fetch(&url).await?;
    let saved_path = store
        .save(&bytes, &destination.namespace, &destination.label, extension_from_url(&url))
        .await?;
    info!("saved {} bytes from {} to {:?}", bytes.len(), url, saved_path);

    Ok(GeneratedArtifact {
        locator: ArtifactLocator::Url(url),
        saved_path,
    })
}
