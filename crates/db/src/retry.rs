//! Bounded retry for transactions that lose a serialization race.
//!
//! Postgres aborts one side of a conflicting SERIALIZABLE transaction with
//! SQLSTATE `40001` (or `40P01` for a deadlock). The whole transaction must
//! be replayed, so the operation passed in here opens its own transaction.

use std::future::Future;

/// Attempts made by [`retry_on_conflict`] callers that have no better number.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Whether `err` is a serialization failure or deadlock worth replaying.
pub fn is_serialization_failure(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"))
        }
        _ => false,
    }
}

/// Run `op`, replaying it after serialization failures, at most `max_attempts` times.
pub async fn retry_on_conflict<T, F, Fut>(max_attempts: u32, op: F) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    retry_if(max_attempts, is_serialization_failure, op).await
}

/// Run `op` until it succeeds, fails with an error `should_retry` rejects, or
/// `max_attempts` runs are used up. The last error is returned.
///
/// A `max_attempts` of zero still runs `op` once.
pub async fn retry_if<T, E, F, Fut, P>(
    max_attempts: u32,
    should_retry: P,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && should_retry(&e) => {
                tracing::warn!(attempt, max_attempts, error = %e, "Transaction conflict, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
