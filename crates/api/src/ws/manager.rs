use std::collections::{HashMap, HashSet};

use axum::body::Bytes;
use axum::extract::ws::Message;
use beacon_core::types::{DbId, Timestamp};
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// How the client reached the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Plain,
    Secure,
}

/// The user a session authenticated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: DbId,
    pub role: String,
}

/// Metadata for a single WebSocket connection.
pub struct Session {
    pub transport: Transport,
    /// Set after a valid `token` event.
    pub user: Option<SessionUser>,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// All live WebSocket sessions, keyed by socket id.
///
/// Thread-safe via interior `RwLock`; wrapped in `Arc` and shared between
/// the socket handlers and the notification fan-out.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register an anonymous session.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink. Re-using an id replaces the
    /// previous session.
    pub async fn add(
        &self,
        socket_id: String,
        transport: Transport,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session {
            transport,
            user: None,
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.sessions.write().await.insert(socket_id, session);
        rx
    }

    /// Remove a session by its id.
    pub async fn remove(&self, socket_id: &str) {
        if let Some(session) = self.sessions.write().await.remove(socket_id) {
            let connected_secs = (chrono::Utc::now() - session.connected_at).num_seconds();
            tracing::debug!(
                conn_id = %socket_id,
                transport = ?session.transport,
                connected_secs,
                "Session removed"
            );
        }
    }

    /// Attach an authenticated user. Returns `false` for unknown sockets.
    pub async fn attach_user(&self, socket_id: &str, user: SessionUser) -> bool {
        match self.sessions.write().await.get_mut(socket_id) {
            Some(session) => {
                session.user = Some(user);
                true
            }
            None => false,
        }
    }

    /// The user attached to a session, if any.
    pub async fn user_of(&self, socket_id: &str) -> Option<SessionUser> {
        self.sessions
            .read()
            .await
            .get(socket_id)
            .and_then(|session| session.user.clone())
    }

    /// Send to one session. Returns `false` if it is gone.
    pub async fn send_to(&self, socket_id: &str, message: Message) -> bool {
        self.sessions
            .read()
            .await
            .get(socket_id)
            .is_some_and(|session| session.sender.send(message).is_ok())
    }

    /// Send a message to all sessions belonging to a specific user.
    ///
    /// Returns the number of sessions the message was sent to.
    pub async fn send_to_user(&self, user_id: DbId, message: Message) -> usize {
        self.send_where(message, |user| user.user_id == user_id).await
    }

    /// Send a message to every session whose user is in `user_ids`.
    pub async fn send_to_users(&self, user_ids: &HashSet<DbId>, message: Message) -> usize {
        if user_ids.is_empty() {
            return 0;
        }
        self.send_where(message, |user| user_ids.contains(&user.user_id))
            .await
    }

    async fn send_where(&self, message: Message, matches: impl Fn(&SessionUser) -> bool) -> usize {
        let sessions = self.sessions.read().await;
        let mut count = 0;
        for session in sessions.values() {
            if session.user.as_ref().is_some_and(&matches)
                && session.sender.send(message.clone()).is_ok()
            {
                count += 1;
            }
        }
        count
    }

    /// Broadcast a message to every session, anonymous ones included.
    ///
    /// Sessions whose channels are closed are skipped (they will be cleaned
    /// up on their next receive loop iteration). Returns the number reached.
    pub async fn broadcast(&self, message: Message) -> usize {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|session| session.sender.send(message.clone()).is_ok())
            .count()
    }

    /// Return the current number of live sessions.
    pub async fn connection_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Number of live sessions that arrived over `transport`.
    pub async fn transport_count(&self, transport: Transport) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|session| session.transport == transport)
            .count()
    }

    /// Number of sessions that have authenticated.
    pub async fn authenticated_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|session| session.user.is_some())
            .count()
    }

    /// Send a Close frame to every session, then clear the map.
    pub async fn shutdown_all(&self) {
        let mut sessions = self.sessions.write().await;
        let count = sessions.len();
        for session in sessions.values() {
            let _ = session.sender.send(Message::Close(None));
        }
        sessions.clear();
        tracing::info!(count, "Closed all WebSocket sessions");
    }

    /// Send a Ping frame to every session.
    pub async fn ping_all(&self) {
        let sessions = self.sessions.read().await;
        for session in sessions.values() {
            let _ = session.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
