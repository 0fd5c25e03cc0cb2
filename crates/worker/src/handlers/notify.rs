//! Delivers a deferred notification once its `send_at` arrives.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use beacon_core::notification::Notification;
use beacon_db::models::job::Job;
use beacon_events::{publish_notification, NotificationStore, Publisher};
use serde_json::json;

use crate::registry::JobHandler;

/// Handler for `notify` jobs: stores the notification and republishes it
/// so the WebSocket fan-out delivers it.
pub struct NotifyHandler {
    store: Arc<dyn NotificationStore>,
    publisher: Arc<dyn Publisher>,
}

impl NotifyHandler {
    pub fn new(store: Arc<dyn NotificationStore>, publisher: Arc<dyn Publisher>) -> Self {
        Self { store, publisher }
    }
}

#[async_trait]
impl JobHandler for NotifyHandler {
    async fn run(&self, job: &Job) -> anyhow::Result<serde_json::Value> {
        let mut notification: Notification = serde_json::from_value(job.input_data.clone())
            .context("input_data is not a notification")?;

        // Due now; a fresh envelope id per delivery.
        notification.send_at = None;
        notification.id = None;
        notification.check()?;

        let id = publish_notification(self.store.as_ref(), self.publisher.as_ref(), &notification)
            .await
            .context("publishing notification")?;

        Ok(json!({ "notification_id": id }))
    }
}
