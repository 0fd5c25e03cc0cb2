//! Built-in job handlers.

pub mod notify;

pub use notify::NotifyHandler;
