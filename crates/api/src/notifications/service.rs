use std::sync::Arc;

use beacon_core::job::{Schedule, NOTIFY_JOB_NAME};
use beacon_core::notification::Notification;
use beacon_core::types::DbId;
use beacon_db::models::job::SaveJob;
use beacon_events::{publish_notification, NotificationStore, Publisher};
use beacon_worker::store::{enqueue, JobStore};
use chrono::Utc;
use serde::Serialize;

use super::NotificationError;

/// What happened to a submitted notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Submitted {
    /// Stored and announced; the fan-out delivers it now.
    Published { notification_id: String },
    /// Wrapped in a `notify` job for its `send_at`.
    Scheduled { job_id: DbId },
}

/// Entry point for producers of notifications.
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    publisher: Arc<dyn Publisher>,
    jobs: Arc<dyn JobStore>,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        publisher: Arc<dyn Publisher>,
        jobs: Arc<dyn JobStore>,
    ) -> Self {
        Self {
            store,
            publisher,
            jobs,
        }
    }

    /// Validate `notification`, then publish it or defer it to `send_at`.
    ///
    /// Envelope ids are always assigned here; one sent by the producer is
    /// discarded.
    pub async fn submit(
        &self,
        notification: &Notification,
    ) -> Result<Submitted, NotificationError> {
        notification.check()?;

        if let Some(schedule) = notification.deferred_schedule(Utc::now())? {
            let job_id = self.defer(notification, schedule).await?;
            return Ok(Submitted::Scheduled { job_id });
        }

        let mut fresh = notification.clone();
        fresh.id = None;
        let notification_id =
            publish_notification(self.store.as_ref(), self.publisher.as_ref(), &fresh).await?;
        Ok(Submitted::Published { notification_id })
    }

    /// Enqueue a `notify` job that republishes `notification` inside `schedule`.
    pub async fn defer(
        &self,
        notification: &Notification,
        schedule: Schedule,
    ) -> Result<DbId, NotificationError> {
        let mut input = notification.clone();
        input.id = None;
        let job = SaveJob::new(NOTIFY_JOB_NAME, serde_json::to_value(&input)?, schedule);

        let job_id = enqueue(self.jobs.as_ref(), self.publisher.as_ref(), &job).await?;
        tracing::info!(job_id, scheduled_for = %schedule.scheduled_for(), "Notification deferred");
        Ok(job_id)
    }
}
