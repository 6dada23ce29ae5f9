use async_trait::async_trait;

use crate::cores::jobs::schemas::GeneratedArtifact;
use crate::cores::state::AppState;
use crate::errors::GatewayError;

// One implementation per provider: turns a validated request into a saved artifact.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    type Request: Send + 'static;

    async fn generate_or_edit(&self, state: &AppState, request: Self::Request) -> Result<GeneratedArtifact, GatewayError>;
}
