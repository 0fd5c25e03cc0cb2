//! Beacon background job worker.
//!
//! - [`store`]: the [`JobStore`](store::JobStore) seam over Postgres.
//! - [`registry`]: named [`JobHandler`](registry::JobHandler)s.
//! - [`runner`]: executes one started job and records its outcome.
//! - [`worker`]: the polling loop that starts due jobs.
//! - [`retention`]: periodic cleanup of finished jobs.

pub mod config;
pub mod handlers;
pub mod registry;
pub mod retention;
pub mod runner;
pub mod store;
pub mod worker;
