//! JSON events exchanged over the socket: `{"event": "...", "data": ...}`.

use axum::extract::ws::Message;
use beacon_core::notification::{Notification, NotificationPayload};
use serde::{Deserialize, Serialize};

/// Events a client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Authenticate the session with a signed token.
    #[serde(rename = "token")]
    Token(String),

    /// Submit a notification (admin sessions only).
    #[serde(rename = "notification")]
    Notification(Notification),
}

/// Events the server sends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "notification")]
    Notification(NotificationPayload),

    #[serde(rename = "notification:ack")]
    NotificationAck { ok: bool },

    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerEvent {
    pub fn to_message(&self) -> Result<Message, serde_json::Error> {
        let text = serde_json::to_string(self)?;
        Ok(Message::Text(text.into()))
    }
}
