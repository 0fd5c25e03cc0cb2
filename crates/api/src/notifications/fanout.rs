//! Delivers published notifications to live sessions.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use beacon_core::notification::{Notification, Target};
use beacon_core::types::DbId;
use beacon_db::repositories::RoleRepo;
use beacon_db::DbPool;
use beacon_events::{BrokerEvent, NotificationStore};
use chrono::Utc;
use tokio::sync::broadcast;

use super::{NotificationError, NotificationService};
use crate::ws::protocol::ServerEvent;
use crate::ws::SessionRegistry;

/// Resolves role membership for role-targeted notifications.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn member_user_ids(&self, role_id: DbId) -> Result<Vec<DbId>, sqlx::Error>;
}

/// [`RoleDirectory`] over the `users` table.
pub struct PgRoleDirectory {
    pool: DbPool,
}

impl PgRoleDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleDirectory for PgRoleDirectory {
    async fn member_user_ids(&self, role_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        RoleRepo::member_user_ids(&self.pool, role_id).await
    }
}

/// Maps notifications to sessions and emits `notification` events.
///
/// Delivery is best-effort: sessions that are offline when a notification
/// arrives never see it.
pub struct NotificationFanout {
    sessions: Arc<SessionRegistry>,
    roles: Arc<dyn RoleDirectory>,
    store: Arc<dyn NotificationStore>,
    service: Arc<NotificationService>,
}

impl NotificationFanout {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        roles: Arc<dyn RoleDirectory>,
        store: Arc<dyn NotificationStore>,
        service: Arc<NotificationService>,
    ) -> Self {
        Self {
            sessions,
            roles,
            store,
            service,
        }
    }

    /// Consume notification events until the bus closes.
    pub async fn run(self, mut receiver: broadcast::Receiver<BrokerEvent>) {
        loop {
            match receiver.recv().await {
                Ok(BrokerEvent::Notification(id)) => {
                    if let Err(e) = self.handle(&id).await {
                        tracing::error!(
                            error = %e,
                            notification_id = %id,
                            "Failed to deliver notification"
                        );
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification fan-out lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification fan-out shutting down");
                    break;
                }
            }
        }
    }

    /// Fetch the envelope for `id` and deliver it, or defer it when its
    /// `send_at` is still ahead. Returns the number of sessions reached.
    pub async fn handle(&self, id: &str) -> Result<usize, NotificationError> {
        let Some(notification) = self.store.get(id).await? else {
            tracing::warn!(notification_id = %id, "Notification envelope missing or expired");
            return Ok(0);
        };

        if let Some(schedule) = notification.deferred_schedule(Utc::now())? {
            self.service.defer(&notification, schedule).await?;
            return Ok(0);
        }

        self.deliver(&notification).await
    }

    /// Emit `notification` to its target sessions.
    pub async fn deliver(&self, notification: &Notification) -> Result<usize, NotificationError> {
        let target = notification.check()?;
        let message = ServerEvent::Notification(notification.payload()).to_message()?;

        let delivered = match target {
            Target::User(user_id) => self.sessions.send_to_user(user_id, message).await,
            Target::Role(role_id) => {
                let members: HashSet<DbId> = self
                    .roles
                    .member_user_ids(role_id)
                    .await?
                    .into_iter()
                    .collect();
                self.sessions.send_to_users(&members, message).await
            }
            Target::Broadcast => self.sessions.broadcast(message).await,
        };

        tracing::debug!(?target, delivered, "Notification delivered");
        Ok(delivered)
    }
}
