//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the local publish/subscribe hub for [`BrokerEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` across the application.

use async_trait::async_trait;
use beacon_core::channels::{JOBS_CREATED, JOBS_FAILURE, JOBS_SUCCESS, NOTIFICATIONS};
use beacon_core::types::DbId;
use tokio::sync::broadcast;

use crate::error::EventError;

// ---------------------------------------------------------------------------
// BrokerEvent
// ---------------------------------------------------------------------------

/// A message carried on one of the project's pub/sub channels.
///
/// Job events only wake the worker loop; their job id is informational.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    JobCreated(Option<DbId>),
    JobSucceeded(Option<DbId>),
    JobFailed(Option<DbId>),
    /// A stored notification envelope is ready for fan-out.
    Notification(String),
}

impl BrokerEvent {
    /// Channel suffix (see [`beacon_core::channels`]) this event travels on.
    pub fn channel_suffix(&self) -> &'static str {
        match self {
            Self::JobCreated(_) => JOBS_CREATED,
            Self::JobSucceeded(_) => JOBS_SUCCESS,
            Self::JobFailed(_) => JOBS_FAILURE,
            Self::Notification(_) => NOTIFICATIONS,
        }
    }

    /// Wire payload: the job id (or empty) or the notification id.
    pub fn payload(&self) -> String {
        match self {
            Self::JobCreated(id) | Self::JobSucceeded(id) | Self::JobFailed(id) => {
                id.map(|id| id.to_string()).unwrap_or_default()
            }
            Self::Notification(id) => id.clone(),
        }
    }

    /// Rebuild an event from a channel suffix and payload.
    ///
    /// Unknown suffixes and notification messages without an id yield `None`.
    pub fn from_message(suffix: &str, payload: &str) -> Option<Self> {
        let job_id = || payload.trim().parse::<DbId>().ok();
        match suffix {
            JOBS_CREATED => Some(Self::JobCreated(job_id())),
            JOBS_SUCCESS => Some(Self::JobSucceeded(job_id())),
            JOBS_FAILURE => Some(Self::JobFailed(job_id())),
            NOTIFICATIONS if !payload.trim().is_empty() => {
                Some(Self::Notification(payload.trim().to_string()))
            }
            _ => None,
        }
    }

    /// Whether the event should trigger a worker pass.
    pub fn is_job_event(&self) -> bool {
        !matches!(self, Self::Notification(_))
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// Where producers announce job lifecycle changes and new notifications.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, event: BrokerEvent) -> Result<(), EventError>;
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`BrokerEvent`].
///
/// # Usage
///
/// ```rust
/// use beacon_events::bus::{BrokerEvent, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.send(BrokerEvent::JobCreated(Some(1)));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<BrokerEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Deliver an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn send(&self, event: BrokerEvent) {
        // SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events sent on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<BrokerEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Publishing straight onto the bus keeps a single process working without Redis.
#[async_trait]
impl Publisher for EventBus {
    async fn publish(&self, event: BrokerEvent) -> Result<(), EventError> {
        self.send(event);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
