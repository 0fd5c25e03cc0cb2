//! Short-lived notification envelopes.
//!
//! Producers store the full [`Notification`] under a fresh id and publish
//! only the id; the fan-out fetches the envelope when the message arrives.

use async_trait::async_trait;
use beacon_core::channels::Channels;
use beacon_core::notification::{Notification, DEFAULT_TTL_SECS};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::bus::{BrokerEvent, Publisher};
use crate::error::EventError;

/// Key/value store for notification envelopes.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist `notification`, returning its id. A missing id is assigned.
    async fn put(&self, notification: &Notification) -> Result<String, EventError>;

    /// Fetch an envelope. Expired or unknown ids yield `None`.
    async fn get(&self, id: &str) -> Result<Option<Notification>, EventError>;
}

/// [`NotificationStore`] holding envelopes as JSON strings with a TTL.
#[derive(Clone)]
pub struct RedisNotificationStore {
    conn: MultiplexedConnection,
    channels: Channels,
    ttl_secs: u64,
}

impl RedisNotificationStore {
    pub fn new(conn: MultiplexedConnection, channels: Channels) -> Self {
        Self {
            conn,
            channels,
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }

    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs.max(1);
        self
    }
}

#[async_trait]
impl NotificationStore for RedisNotificationStore {
    async fn put(&self, notification: &Notification) -> Result<String, EventError> {
        let (id, body) = envelope(notification)?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(self.channels.notification_key(&id), body, self.ttl_secs)
            .await?;
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<Notification>, EventError> {
        let mut conn = self.conn.clone();
        let body: Option<String> = conn.get(self.channels.notification_key(id)).await?;
        body.map(|body| serde_json::from_str(&body))
            .transpose()
            .map_err(EventError::from)
    }
}

/// Assign an id when missing and serialize the envelope.
pub fn envelope(notification: &Notification) -> Result<(String, String), EventError> {
    let mut stored = notification.clone();
    let id = stored
        .id
        .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
        .clone();
    let body = serde_json::to_string(&stored)?;
    Ok((id, body))
}

/// Store `notification` and announce its id on the notifications channel.
pub async fn publish_notification(
    store: &dyn NotificationStore,
    publisher: &dyn Publisher,
    notification: &Notification,
) -> Result<String, EventError> {
    let id = store.put(notification).await?;
    publisher.publish(BrokerEvent::Notification(id.clone())).await?;
    tracing::debug!(notification_id = %id, "Notification published");
    Ok(id)
}
