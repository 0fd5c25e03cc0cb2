//! Periodic cleanup of finished jobs.
//!
//! Deletes `success` and `failure` rows not touched for longer than the
//! retention period. Runs on a fixed interval using `tokio::time::interval`.

use std::time::Duration;

use beacon_db::repositories::JobRepo;
use beacon_db::DbPool;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

/// How often the cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Run the retention loop until `cancel` is triggered.
pub async fn run(pool: DbPool, retention_hours: i64, cancel: CancellationToken) {
    tracing::info!(
        retention_hours,
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Job retention started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job retention stopping");
                break;
            }
            _ = interval.tick() => {
                let cutoff = Utc::now() - chrono::Duration::hours(retention_hours);
                match JobRepo::delete_finished_before(&pool, cutoff).await {
                    Ok(0) => tracing::debug!("Job retention: no rows to purge"),
                    Ok(deleted) => tracing::info!(deleted, "Job retention: purged finished jobs"),
                    Err(e) => tracing::error!(error = %e, "Job retention: cleanup failed"),
                }
            }
        }
    }
}
