//! Shared domain types for the Beacon job and notification services.
//!
//! Everything here is free of I/O so the database, pub/sub, worker and API
//! crates can agree on naming, scheduling rules and validation.

pub mod channels;
pub mod error;
pub mod job;
pub mod notification;
pub mod roles;
pub mod types;
