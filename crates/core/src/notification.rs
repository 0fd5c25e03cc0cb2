//! Transient notification envelopes.
//!
//! A [`Notification`] lives in Redis for a short TTL between the producer and
//! the WebSocket fan-out. It is not a durable record.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::job::{Schedule, NOTIFY_VALIDITY_MINS};
use crate::types::{DbId, Timestamp};

/// Seconds a stored notification stays fetchable.
pub const DEFAULT_TTL_SECS: u64 = 60;

/// A notification addressed to a user, a role, or everyone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Notification {
    /// Store key, assigned when the envelope is persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[validate(length(min = 1, message = "text is required"))]
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Substitution values for the client-side text template.
    #[serde(default)]
    pub variables: serde_json::Map<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<DbId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<DbId>,

    /// Deliver later instead of immediately.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_at: Option<Timestamp>,
}

/// Who a notification is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    User(DbId),
    Role(DbId),
    Broadcast,
}

/// The body pushed to clients in a `notification` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub text: String,
    pub variables: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Notification {
    /// A broadcast notification with only the required text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            title: None,
            icon: None,
            variables: serde_json::Map::new(),
            user_id: None,
            role_id: None,
            send_at: None,
        }
    }

    pub fn for_user(mut self, user_id: DbId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn for_role(mut self, role_id: DbId) -> Self {
        self.role_id = Some(role_id);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.variables.insert(key.into(), value);
        self
    }

    pub fn deliver_at(mut self, send_at: Timestamp) -> Self {
        self.send_at = Some(send_at);
        self
    }

    /// Resolve the addressing mode. Setting both a user and a role is an error.
    pub fn target(&self) -> Result<Target, CoreError> {
        match (self.user_id, self.role_id) {
            (Some(_), Some(_)) => Err(CoreError::Validation(
                "a notification targets a user or a role, not both".into(),
            )),
            (Some(user_id), None) => Ok(Target::User(user_id)),
            (None, Some(role_id)) => Ok(Target::Role(role_id)),
            (None, None) => Ok(Target::Broadcast),
        }
    }

    /// Validate required fields, targeting and the delivery window.
    pub fn check(&self) -> Result<Target, CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        if let Some(at) = self.send_at {
            delivery_window(at)?;
        }
        self.target()
    }

    /// The delivery window when `send_at` lies after `now`, else `None`.
    pub fn deferred_schedule(&self, now: Timestamp) -> Result<Option<Schedule>, CoreError> {
        self.send_at
            .filter(|at| *at > now)
            .map(delivery_window)
            .transpose()
    }

    pub fn payload(&self) -> NotificationPayload {
        NotificationPayload {
            text: self.text.clone(),
            variables: self.variables.clone(),
            title: self.title.clone(),
            icon: self.icon.clone(),
        }
    }
}

fn delivery_window(send_at: Timestamp) -> Result<Schedule, CoreError> {
    Schedule::starting_at(send_at, Duration::minutes(NOTIFY_VALIDITY_MINS))
}
