use crate::types::{DbId, Timestamp};

/// Domain errors shared by every Beacon crate.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// A job window whose start lies after its end.
    #[error("Invalid schedule: scheduled_for {scheduled_for} is after valid_until {valid_until}")]
    InvalidSchedule {
        scheduled_for: Timestamp,
        valid_until: Timestamp,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}
