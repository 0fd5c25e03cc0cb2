//! The polling loop that moves due jobs to `started` and runs them.

use std::sync::Arc;
use std::time::Duration;

use beacon_core::types::DbId;
use beacon_events::BrokerEvent;
use chrono::Utc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::runner::{JobOutcome, JobRunner};
use crate::store::JobStore;

/// Default interval between scheduled passes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Result of one pass.
#[derive(Debug, Default)]
pub struct PassReport {
    /// Jobs this pass moved to `started`.
    pub started: Vec<DbId>,
    /// Jobs whose window had closed; removed from the queue.
    pub expired: Vec<DbId>,
    /// Spawned runs of the started jobs, in the same order.
    pub running: Vec<JoinHandle<JobOutcome>>,
}

/// Fixed-interval worker loop, woken early by job events.
pub struct JobWorker {
    store: Arc<dyn JobStore>,
    runner: JobRunner,
    poll_interval: Duration,
}

impl JobWorker {
    pub fn new(store: Arc<dyn JobStore>, runner: JobRunner) -> Self {
        Self {
            store,
            runner,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run until `cancel` fires.
    ///
    /// Resets interrupted jobs first, then runs a pass immediately, on
    /// every tick, and on every job event received from `events`. Jobs
    /// already running are not cancelled on shutdown.
    pub async fn run(
        &self,
        mut events: broadcast::Receiver<BrokerEvent>,
        cancel: CancellationToken,
    ) {
        match self.store.restart_interrupted().await {
            Ok(0) => {}
            Ok(count) => tracing::info!(count, "Reset interrupted jobs to created"),
            Err(e) => tracing::error!(error = %e, "Failed to reset interrupted jobs"),
        }

        // First tick completes immediately.
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut events_open = true;

        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Job worker started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Job worker shutting down");
                    break;
                }
                _ = ticker.tick() => self.pass("interval").await,
                event = events.recv(), if events_open => match event {
                    Ok(event) if event.is_job_event() => self.pass(event.channel_suffix()).await,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Job worker lagged behind the event bus");
                        self.pass("lagged").await;
                    }
                    Err(RecvError::Closed) => {
                        tracing::warn!("Event bus closed; continuing on the timer only");
                        events_open = false;
                    }
                },
            }
        }
    }

    async fn pass(&self, trigger: &str) {
        match self.run_pass().await {
            Ok(report) => {
                if !report.started.is_empty() || !report.expired.is_empty() {
                    tracing::debug!(
                        trigger,
                        started = report.started.len(),
                        expired = report.expired.len(),
                        "Worker pass finished",
                    );
                }
            }
            Err(e) => tracing::error!(trigger, error = %e, "Worker pass failed"),
        }
    }

    /// Start due jobs, drop expired ones, and spawn a run for each started job.
    pub async fn run_pass(&self) -> Result<PassReport, sqlx::Error> {
        let processed = self.store.process_new_jobs(Utc::now()).await?;

        for job in &processed.expired {
            tracing::warn!(
                job_id = job.id,
                job_name = %job.name,
                valid_until = %job.valid_until,
                "Job expired before it could start",
            );
        }

        let mut report = PassReport {
            expired: processed.expired.iter().map(|job| job.id).collect(),
            ..PassReport::default()
        };

        for job in processed.started {
            report.started.push(job.id);
            let runner = self.runner.clone();
            report
                .running
                .push(tokio::spawn(async move { runner.run(job).await }));
        }

        Ok(report)
    }
}
