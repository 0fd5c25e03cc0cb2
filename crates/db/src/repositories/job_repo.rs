//! Repository for the `jobs` table.
//!
//! Every status change is a conditional `UPDATE ... WHERE status_id = <from>`
//! so two workers racing on the same row cannot both win the transition.

use beacon_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::job::{Job, ProcessedJobs, SaveJob};
use crate::models::status::{JobStatus, StatusId};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, name, status_id, input_data, output_data, \
    scheduled_for, valid_until, created_at, updated_at";

/// Statuses a job never leaves except by deletion.
const TERMINAL_STATUSES: [StatusId; 2] = [
    JobStatus::Success as StatusId,
    JobStatus::Failure as StatusId,
];

/// Provides persistence for background jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert the job when it has no id, otherwise overwrite the existing row.
    ///
    /// Returns the job id. Updating a missing or finished job yields
    /// `RowNotFound`.
    pub async fn save(pool: &PgPool, job: &SaveJob) -> Result<DbId, sqlx::Error> {
        match job.id {
            None => {
                sqlx::query_scalar::<_, DbId>(
                    "INSERT INTO jobs \
                         (name, status_id, input_data, output_data, scheduled_for, valid_until) \
                     VALUES ($1, $2, $3, $4, $5, $6) \
                     RETURNING id",
                )
                .bind(&job.name)
                .bind(job.status.id())
                .bind(&job.input_data)
                .bind(&job.output_data)
                .bind(job.schedule.scheduled_for())
                .bind(job.schedule.valid_until())
                .fetch_one(pool)
                .await
            }
            Some(id) => sqlx::query_scalar::<_, DbId>(
                "UPDATE jobs \
                 SET name = $2, status_id = $3, input_data = $4, output_data = $5, \
                     scheduled_for = $6, valid_until = $7, updated_at = NOW() \
                 WHERE id = $1 AND status_id <> ALL($8) \
                 RETURNING id",
            )
            .bind(id)
            .bind(&job.name)
            .bind(job.status.id())
            .bind(&job.input_data)
            .bind(&job.output_data)
            .bind(job.schedule.scheduled_for())
            .bind(job.schedule.valid_until())
            .bind(&TERMINAL_STATUSES[..])
            .fetch_optional(pool)
            .await?
            .ok_or(sqlx::Error::RowNotFound),
        }
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List every job, oldest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs ORDER BY id ASC");
        sqlx::query_as::<_, Job>(&query).fetch_all(pool).await
    }

    /// Delete a job. Returns `false` when no row matched.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Put every `started` job back to `created`.
    ///
    /// Called once at worker startup: anything still `started` was running
    /// in a process that died.
    pub async fn restart_interrupted(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE jobs SET status_id = $1, updated_at = NOW() WHERE status_id = $2")
                .bind(JobStatus::Created.id())
                .bind(JobStatus::Started.id())
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Start every due job and drop every expired one, in one transaction.
    ///
    /// Due: `created`, `scheduled_for <= now`, `valid_until >= now`.
    /// Expired: `created`, `valid_until < now`. Jobs not yet due are untouched.
    pub async fn process_new_jobs(
        pool: &PgPool,
        now: Timestamp,
    ) -> Result<ProcessedJobs, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let start_query = format!(
            "UPDATE jobs SET status_id = $1, updated_at = NOW() \
             WHERE status_id = $2 AND scheduled_for <= $3 AND valid_until >= $3 \
             RETURNING {COLUMNS}"
        );
        let mut started = sqlx::query_as::<_, Job>(&start_query)
            .bind(JobStatus::Started.id())
            .bind(JobStatus::Created.id())
            .bind(now)
            .fetch_all(&mut *tx)
            .await?;

        let expire_query = format!(
            "DELETE FROM jobs WHERE status_id = $1 AND valid_until < $2 RETURNING {COLUMNS}"
        );
        let mut expired = sqlx::query_as::<_, Job>(&expire_query)
            .bind(JobStatus::Created.id())
            .bind(now)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;

        started.sort_by_key(|job| job.id);
        expired.sort_by_key(|job| job.id);
        Ok(ProcessedJobs { started, expired })
    }

    /// Move a `started` job to `success` with its output.
    ///
    /// Returns `false` if the job was not `started` (or does not exist).
    pub async fn complete(
        pool: &PgPool,
        job_id: DbId,
        output: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        Self::finish(pool, job_id, JobStatus::Success, output).await
    }

    /// Move a `started` job to `failure`; `output` carries the error details.
    pub async fn fail(
        pool: &PgPool,
        job_id: DbId,
        output: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        Self::finish(pool, job_id, JobStatus::Failure, output).await
    }

    async fn finish(
        pool: &PgPool,
        job_id: DbId,
        status: JobStatus,
        output: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET status_id = $2, output_data = $3, updated_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(job_id)
        .bind(status.id())
        .bind(output)
        .bind(JobStatus::Started.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete terminal jobs last touched before `cutoff`. Returns rows removed.
    pub async fn delete_finished_before(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM jobs WHERE status_id = ANY($1) AND updated_at < $2")
            .bind(&TERMINAL_STATUSES[..])
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
