//! Row models and DTOs.

pub mod job;
pub mod role;
pub mod status;
