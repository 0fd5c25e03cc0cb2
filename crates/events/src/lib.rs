//! Beacon pub/sub plumbing.
//!
//! - [`EventBus`]: in-process fan-out of [`BrokerEvent`]s backed by
//!   `tokio::sync::broadcast`. The worker loop and the notification fan-out
//!   subscribe here.
//! - [`RedisPubSub`]: publishes events to Redis and forwards messages from
//!   the project's Redis channels onto an [`EventBus`].
//! - [`NotificationStore`]: short-lived notification envelopes
//!   ([`RedisNotificationStore`] in production).
//! - [`Publisher`]: the seam producers publish through.

pub mod bus;
pub mod error;
pub mod pubsub;
pub mod store;

pub use bus::{BrokerEvent, EventBus, Publisher};
pub use error::EventError;
pub use pubsub::RedisPubSub;
pub use store::{publish_notification, NotificationStore, RedisNotificationStore};
