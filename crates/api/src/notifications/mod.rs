//! Notification intake and delivery.
//!
//! - [`NotificationService`] accepts notifications from sockets and HTTP
//!   producers: due ones are stored and published, future ones become
//!   `notify` jobs.
//! - [`NotificationFanout`] consumes published ids from the event bus and
//!   pushes each notification to the matching live sessions.

pub mod fanout;
pub mod service;

pub use fanout::{NotificationFanout, PgRoleDirectory, RoleDirectory};
pub use service::{NotificationService, Submitted};

use beacon_core::error::CoreError;
use beacon_events::EventError;

/// Errors raised while accepting or delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Events(#[from] EventError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
