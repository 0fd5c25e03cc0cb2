//! Job entity models and DTOs for the background job queue.

use beacon_core::job::Schedule;
use beacon_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::{JobStatus, StatusId};

/// A row from the `jobs` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub name: String,
    pub status_id: StatusId,
    pub input_data: serde_json::Value,
    pub output_data: Option<serde_json::Value>,
    pub scheduled_for: Timestamp,
    pub valid_until: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    /// Decode `status_id`; `None` only if the lookup table grew a new row.
    pub fn status(&self) -> Option<JobStatus> {
        JobStatus::try_from(self.status_id).ok()
    }

    pub fn schedule(&self) -> Schedule {
        // The table's CHECK constraint guarantees the window is ordered.
        Schedule::clamped(self.scheduled_for, self.valid_until)
    }
}

/// Input for `JobRepo::save`: inserts when `id` is `None`, updates otherwise.
#[derive(Debug, Clone)]
pub struct SaveJob {
    pub id: Option<DbId>,
    pub name: String,
    pub status: JobStatus,
    pub schedule: Schedule,
    pub input_data: serde_json::Value,
    pub output_data: Option<serde_json::Value>,
}

impl SaveJob {
    /// A new job in `created` status.
    pub fn new(name: impl Into<String>, input_data: serde_json::Value, schedule: Schedule) -> Self {
        Self {
            id: None,
            name: name.into(),
            status: JobStatus::Created,
            schedule,
            input_data,
            output_data: None,
        }
    }
}

/// Result of one `process_new_jobs` pass.
#[derive(Debug, Default, Clone)]
pub struct ProcessedJobs {
    /// Jobs moved from `created` to `started` by this pass.
    pub started: Vec<Job>,
    /// Jobs whose window closed before they started; removed from the queue.
    pub expired: Vec<Job>,
}
