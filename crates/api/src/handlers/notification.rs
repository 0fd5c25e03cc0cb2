//! Handler for submitting notifications over HTTP.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use beacon_core::notification::Notification;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/notifications
///
/// Publish a notification now, or schedule it when `send_at` is in the
/// future. Returns 202 with `notification_id` or `job_id`.
pub async fn submit_notification(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<Notification>,
) -> AppResult<impl IntoResponse> {
    let submitted = state.notifications.submit(&input).await?;

    tracing::info!(user_id = admin.user_id, ?submitted, "Notification submitted over HTTP");

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: submitted })))
}
