pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                     WebSocket (token + notification events)
///
/// /notifications          submit (POST, admin)
///
/// /jobs                   list (GET), create (POST), admin
/// /jobs/{id}              get (GET), delete (DELETE), admin
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route(
            "/notifications",
            post(handlers::notification::submit_notification),
        )
        .route(
            "/jobs",
            get(handlers::jobs::list_jobs).post(handlers::jobs::create_job),
        )
        .route(
            "/jobs/{id}",
            get(handlers::jobs::get_job).delete(handlers::jobs::delete_job),
        )
}
