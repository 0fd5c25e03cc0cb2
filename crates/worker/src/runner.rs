//! Executes a single started job and records the outcome.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use beacon_core::types::DbId;
use beacon_db::models::job::Job;
use beacon_db::models::status::JobStatus;
use beacon_events::{BrokerEvent, Publisher};
use futures::FutureExt;
use serde_json::json;
use tracing::Instrument;

use crate::registry::JobRegistry;
use crate::store::JobStore;

/// Why a job ended in `failure`.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("No handler registered for job '{0}'")]
    MissingHandler(String),

    #[error("Handler panicked: {0}")]
    Panicked(String),

    #[error("{0:#}")]
    Handler(anyhow::Error),
}

/// What a run wrote to the job's `output_data`.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Success(serde_json::Value),
    Failure(serde_json::Value),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Resolves handlers from a [`JobRegistry`] and persists their results.
#[derive(Clone)]
pub struct JobRunner {
    store: Arc<dyn JobStore>,
    registry: Arc<JobRegistry>,
    publisher: Arc<dyn Publisher>,
}

impl JobRunner {
    pub fn new(
        store: Arc<dyn JobStore>,
        registry: Arc<JobRegistry>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            store,
            registry,
            publisher,
        }
    }

    /// Run `job` (already `started`) to completion.
    ///
    /// Never returns an error: handler failures, panics and missing handlers
    /// are recorded as `failure`, and storage or publish errors while
    /// recording are logged. The outcome is only announced once stored.
    pub async fn run(&self, job: Job) -> JobOutcome {
        let span = tracing::info_span!("job", job_id = job.id, job_name = %job.name);
        async {
            tracing::debug!("Running job");

            match self.execute(&job).await {
                Ok(output) => {
                    self.record(&job, true, &output).await;
                    tracing::info!("Job succeeded");
                    JobOutcome::Success(output)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Job failed");
                    let output = json!({ "error": e.to_string() });
                    self.record(&job, false, &output).await;
                    JobOutcome::Failure(output)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, job: &Job) -> Result<serde_json::Value, RunError> {
        let handler = self
            .registry
            .get(&job.name)
            .ok_or_else(|| RunError::MissingHandler(job.name.clone()))?;

        AssertUnwindSafe(handler.run(job))
            .catch_unwind()
            .await
            .map_err(|payload| RunError::Panicked(panic_message(&*payload)))?
            .map_err(RunError::Handler)
    }

    async fn record(&self, job: &Job, success: bool, output: &serde_json::Value) {
        let (stored, event) = if success {
            (
                self.store.mark_success(job.id, output).await,
                BrokerEvent::JobSucceeded(Some(job.id)),
            )
        } else {
            (
                self.store.mark_failure(job.id, output).await,
                BrokerEvent::JobFailed(Some(job.id)),
            )
        };

        match stored {
            Ok(true) => {
                if let Err(e) = self.publisher.publish(event).await {
                    tracing::warn!(error = %e, "Failed to publish job outcome");
                }
            }
            Ok(false) => self.explain_unrecorded(job.id).await,
            Err(e) => tracing::error!(error = %e, "Failed to record job outcome"),
        }
    }

    /// Log why the store refused an outcome. Nothing is published.
    async fn explain_unrecorded(&self, job_id: DbId) {
        match self.store.find(job_id).await {
            Ok(Some(current)) => match current.status() {
                Some(status) if status.is_terminal() => {
                    tracing::warn!(
                        status = status.name(),
                        "Job already finished; outcome not recorded"
                    );
                }
                status => {
                    tracing::warn!(
                        status = ?status.map(JobStatus::name),
                        "Job was no longer started; outcome not recorded"
                    );
                }
            },
            Ok(None) => tracing::warn!("Job was deleted while running; outcome not recorded"),
            Err(e) => tracing::error!(error = %e, "Failed to look up job after refused outcome"),
        }
    }
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
