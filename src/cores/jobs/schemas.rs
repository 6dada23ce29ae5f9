use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

// Returned by a provider when a job is accepted. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: Option<String>,
    pub poll_location: String,
}

impl JobHandle {
    pub fn new(id: Option<String>, poll_location: impl Into<String>) -> Self {
        JobHandle { id, poll_location: poll_location.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending,
    // Provider-specific result descriptor, a downloadable URL for BFL.
    Ready(String),
    Failed(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
    // Transport failures absorbed before a status query error becomes fatal.
    pub error_budget: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        PollSettings {
            interval: Duration::from_secs(3),
            max_attempts: 20,
            error_budget: 0,
        }
    }
}

// Where the produced image can be found remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactLocator {
    Url(String),
    // Inline base64 payload for providers that return the image in the body.
    Inline(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub locator: ArtifactLocator,
    pub saved_path: PathBuf,
}

impl GeneratedArtifact {
    pub fn url(&self) -> Option<&str> {
        match &self.locator {
            ArtifactLocator::Url(url) => Some(url),
            ArtifactLocator::Inline(_) => None,
        }
    }

    pub fn saved_path_string(&self) -> String {
        self.saved_path.to_string_lossy().into_owned()
    }
}
