//! WebSocket sessions for live notifications.
//!
//! Provides the session registry, the JSON event protocol, heartbeat
//! pings, and the HTTP upgrade handler used by Axum routes.

mod handler;
mod heartbeat;
pub mod manager;
pub mod protocol;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::{SessionRegistry, SessionUser, Transport};
