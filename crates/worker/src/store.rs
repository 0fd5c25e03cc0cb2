//! Job persistence seam used by the runner and the worker loop.

use async_trait::async_trait;
use beacon_core::types::{DbId, Timestamp};
use beacon_db::models::job::{Job, ProcessedJobs, SaveJob};
use beacon_db::repositories::JobRepo;
use beacon_db::DbPool;
use beacon_events::{BrokerEvent, Publisher};

/// Storage operations the worker needs. [`PgJobStore`] in production.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert (no id) or overwrite (with id) a job, returning its id.
    async fn save(&self, job: &SaveJob) -> Result<DbId, sqlx::Error>;

    async fn find(&self, id: DbId) -> Result<Option<Job>, sqlx::Error>;

    async fn find_all(&self) -> Result<Vec<Job>, sqlx::Error>;

    /// Returns `false` when the job did not exist.
    async fn delete(&self, id: DbId) -> Result<bool, sqlx::Error>;

    /// Reset every `started` job to `created`, returning how many moved.
    async fn restart_interrupted(&self) -> Result<u64, sqlx::Error>;

    /// Atomically start due jobs and remove expired ones.
    async fn process_new_jobs(&self, now: Timestamp) -> Result<ProcessedJobs, sqlx::Error>;

    /// `started` → `success`. Returns `false` if the job was not started.
    async fn mark_success(&self, id: DbId, output: &serde_json::Value) -> Result<bool, sqlx::Error>;

    /// `started` → `failure`. Returns `false` if the job was not started.
    async fn mark_failure(&self, id: DbId, output: &serde_json::Value) -> Result<bool, sqlx::Error>;
}

/// [`JobStore`] backed by the shared Postgres pool.
#[derive(Clone)]
pub struct PgJobStore {
    pool: DbPool,
}

impl PgJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn save(&self, job: &SaveJob) -> Result<DbId, sqlx::Error> {
        JobRepo::save(&self.pool, job).await
    }

    async fn find(&self, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        JobRepo::find_by_id(&self.pool, id).await
    }

    async fn find_all(&self) -> Result<Vec<Job>, sqlx::Error> {
        JobRepo::list(&self.pool).await
    }

    async fn delete(&self, id: DbId) -> Result<bool, sqlx::Error> {
        JobRepo::delete(&self.pool, id).await
    }

    async fn restart_interrupted(&self) -> Result<u64, sqlx::Error> {
        JobRepo::restart_interrupted(&self.pool).await
    }

    async fn process_new_jobs(&self, now: Timestamp) -> Result<ProcessedJobs, sqlx::Error> {
        JobRepo::process_new_jobs(&self.pool, now).await
    }

    async fn mark_success(
        &self,
        id: DbId,
        output: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        JobRepo::complete(&self.pool, id, output).await
    }

    async fn mark_failure(
        &self,
        id: DbId,
        output: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        JobRepo::fail(&self.pool, id, output).await
    }
}

/// Save a new job and announce it on `jobs:created` so workers wake early.
///
/// A failed announcement is only logged; the next scheduled pass still
/// picks the job up.
pub async fn enqueue(
    store: &dyn JobStore,
    publisher: &dyn Publisher,
    job: &SaveJob,
) -> Result<DbId, sqlx::Error> {
    let id = store.save(job).await?;
    tracing::info!(job_id = id, job_name = %job.name, "Job enqueued");

    if let Err(e) = publisher.publish(BrokerEvent::JobCreated(Some(id))).await {
        tracing::warn!(job_id = id, error = %e, "Failed to announce new job");
    }
    Ok(id)
}
