//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that accept
//! `&PgPool` as the first argument.

pub mod job_repo;
pub mod role_repo;

pub use job_repo::JobRepo;
pub use role_repo::RoleRepo;
