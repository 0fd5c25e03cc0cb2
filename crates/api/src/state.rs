use std::sync::Arc;

use beacon_events::Publisher;
use beacon_worker::store::JobStore;

use crate::config::ServerConfig;
use crate::notifications::NotificationService;
use crate::ws::SessionRegistry;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: beacon_db::DbPool,
    /// Server configuration (JWT secret, CORS, timeouts).
    pub config: Arc<ServerConfig>,
    /// Live WebSocket sessions.
    pub sessions: Arc<SessionRegistry>,
    /// Accepts notifications from sockets and HTTP producers.
    pub notifications: Arc<NotificationService>,
    /// Job persistence.
    pub jobs: Arc<dyn JobStore>,
    /// Broker for job lifecycle announcements.
    pub publisher: Arc<dyn Publisher>,
}
