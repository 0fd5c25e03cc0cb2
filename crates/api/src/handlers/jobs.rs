//! Handlers for the `/jobs` resource.
//!
//! All endpoints require the `admin` role.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use beacon_core::error::CoreError;
use beacon_core::job::{Schedule, DEFAULT_VALIDITY_MINS};
use beacon_core::types::{DbId, Timestamp};
use beacon_db::models::job::SaveJob;
use beacon_worker::store::enqueue;
use chrono::{Duration, Utc};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /api/v1/jobs`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateJob {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[serde(default = "empty_object")]
    pub input_data: serde_json::Value,
    /// Defaults to now.
    pub scheduled_for: Option<Timestamp>,
    /// Defaults to one hour after `scheduled_for`.
    pub valid_until: Option<Timestamp>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl CreateJob {
    fn schedule(&self, now: Timestamp) -> Result<Schedule, CoreError> {
        let start = self.scheduled_for.unwrap_or(now);
        match self.valid_until {
            Some(end) => Schedule::new(start, end),
            None => Schedule::starting_at(start, Duration::minutes(DEFAULT_VALIDITY_MINS)),
        }
    }
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Job", id })
}

/// GET /api/v1/jobs
pub async fn list_jobs(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let jobs = state.jobs.find_all().await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = state.jobs.find(job_id).await?.ok_or_else(|| not_found(job_id))?;
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/jobs
///
/// Enqueue a job in `created` status and wake the workers. Returns 201 with
/// the stored job.
pub async fn create_job(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateJob>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;
    let schedule = input.schedule(Utc::now())?;

    let job = SaveJob::new(input.name, input.input_data, schedule);
    let job_id = enqueue(state.jobs.as_ref(), state.publisher.as_ref(), &job).await?;

    tracing::info!(job_id, user_id = admin.user_id, "Job created over HTTP");

    let job = state.jobs.find(job_id).await?.ok_or_else(|| not_found(job_id))?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

/// DELETE /api/v1/jobs/{id}
pub async fn delete_job(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !state.jobs.delete(job_id).await? {
        return Err(not_found(job_id));
    }
    tracing::info!(job_id, user_id = admin.user_id, "Job deleted");
    Ok(StatusCode::NO_CONTENT)
}
