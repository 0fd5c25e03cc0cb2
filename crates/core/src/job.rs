//! Scheduling rules shared by the job store and the worker loop.
//!
//! A created job is either not yet due, due, or expired. The Postgres
//! queries in `beacon-db` encode the same rules; [`Schedule::readiness`] is
//! the reference definition.

use chrono::Duration;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Handler name for jobs that re-emit a scheduled notification.
pub const NOTIFY_JOB_NAME: &str = "notify";

/// Minutes a scheduled notification stays deliverable after its send time.
pub const NOTIFY_VALIDITY_MINS: i64 = 5;

/// Default validity window for jobs enqueued without an explicit end.
pub const DEFAULT_VALIDITY_MINS: i64 = 60;

/// Where a created job sits relative to its execution window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// `scheduled_for` is still in the future.
    Pending,
    /// Inside the window; the worker may start it.
    Due,
    /// `valid_until` has passed without the job starting.
    Expired,
}

/// The execution window of a job. `scheduled_for <= valid_until` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    scheduled_for: Timestamp,
    valid_until: Timestamp,
}

impl Schedule {
    /// Build a window, rejecting one that ends before it starts.
    pub fn new(scheduled_for: Timestamp, valid_until: Timestamp) -> Result<Self, CoreError> {
        if scheduled_for > valid_until {
            return Err(CoreError::InvalidSchedule {
                scheduled_for,
                valid_until,
            });
        }
        Ok(Self {
            scheduled_for,
            valid_until,
        })
    }

    /// A window opening at `start` and lasting `validity`.
    ///
    /// Negative durations are clamped to zero. A window ending past the
    /// representable date range is a validation error.
    pub fn starting_at(start: Timestamp, validity: Duration) -> Result<Self, CoreError> {
        let valid_until = start
            .checked_add_signed(validity.max(Duration::zero()))
            .ok_or_else(|| {
                CoreError::Validation(format!("schedule starting at {start} is out of range"))
            })?;
        Ok(Self {
            scheduled_for: start,
            valid_until,
        })
    }

    /// Build a window from stored bounds, treating an inverted one as empty.
    pub fn clamped(scheduled_for: Timestamp, valid_until: Timestamp) -> Self {
        Self {
            scheduled_for,
            valid_until: valid_until.max(scheduled_for),
        }
    }

    pub fn scheduled_for(&self) -> Timestamp {
        self.scheduled_for
    }

    pub fn valid_until(&self) -> Timestamp {
        self.valid_until
    }

    /// Classify the window at `now`. Expiry wins over being due.
    pub fn readiness(&self, now: Timestamp) -> Readiness {
        if self.valid_until < now {
            Readiness::Expired
        } else if self.scheduled_for <= now {
            Readiness::Due
        } else {
            Readiness::Pending
        }
    }
}
