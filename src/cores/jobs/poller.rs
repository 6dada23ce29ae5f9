use async_trait::async_trait;
use log::{debug, warn};
use std::time::Duration;

use crate::cores::jobs::schemas::{JobHandle, JobStatus, PollSettings};
use crate::errors::GatewayError;

// One status query against a remote job queue.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    fn provider(&self) -> &'static str;
    async fn status(&self, handle: &JobHandle) -> Result<JobStatus, GatewayError>;
}

// Suspension between status queries. Must yield, never block the worker.
#[async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, interval: Duration);
}

pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, interval: Duration) {
        tokio::time::sleep(interval).await;
    }
}

/// Query `handle` until it reaches a terminal state or the attempt budget runs out.
///
/// `Ready` returns its descriptor without a further pause, `Failed` aborts at once,
/// `Pending` pauses for `settings.interval` before the next query. There is no pause
/// after the last attempt. Status query errors are fatal unless they are transient
/// and `settings.error_budget` still has room; an absorbed error consumes an attempt.
///
/// Dropping the returned future (e.g. when the inbound request is aborted) stops the
/// loop at its next await point.
pub async fn await_completion<S, P>(
    probe: &S,
    handle: &JobHandle,
    settings: &PollSettings,
    pause: &P,
) -> Result<String, GatewayError>
where
    S: StatusProbe + ?Sized,
    P: Pause + ?Sized,
{
    let provider = probe.provider();
    let job_id = handle.id.as_deref().unwrap_or("-");
    let mut absorbed_errors = 0;

    for attempt in 1..=settings.max_attempts {
        match probe.status(handle).await {
            Ok(JobStatus::Ready(descriptor)) => {
                debug!("{} job {} ready after {} status checks", provider, job_id, attempt);
                return Ok(descriptor);
            }
            Ok(JobStatus::Failed(reason)) => {
                warn!(target: "error_log", "{} job {} failed: {}", provider, job_id, reason);
                return Err(GatewayError::JobFailed { provider, reason });
            }
            Ok(JobStatus::Pending) => {
                debug!("{} job {} pending (attempt {}/{})", provider, job_id, attempt, settings.max_attempts);
            }
            Err(err) if err.is_transient() && absorbed_errors < settings.error_budget => {
                absorbed_errors += 1;
                warn!(target: "error_log", "{} job {} status check failed, retrying ({}/{}): {}",
                    provider, job_id, absorbed_errors, settings.error_budget, err);
            }
            Err(err) => return Err(err),
        }

        if attempt < settings.max_attempts {
            pause.pause(settings.interval).await;
        }
    }

    warn!(target: "error_log", "{} job {} still pending after {} status checks", provider, job_id, settings.max_attempts);
    Err(GatewayError::PollingTimeout {
        provider,
        job_id: handle.id.clone(),
        attempts: settings.max_attempts,
    })
}
