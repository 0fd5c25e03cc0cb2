//! Redis pub/sub channel and key naming.
//!
//! Every name is prefixed with the project name (`<project>:jobs:created`)
//! so several deployments can share one Redis instance.

/// A job row was inserted.
pub const JOBS_CREATED: &str = "jobs:created";

/// A job finished successfully.
pub const JOBS_SUCCESS: &str = "jobs:success";

/// A job failed.
pub const JOBS_FAILURE: &str = "jobs:failure";

/// A notification envelope is ready for fan-out. Payload is its id.
pub const NOTIFICATIONS: &str = "notifications";

/// Every channel suffix the services subscribe to.
pub const ALL: [&str; 4] = [JOBS_CREATED, JOBS_SUCCESS, JOBS_FAILURE, NOTIFICATIONS];

/// Project-scoped channel names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channels {
    prefix: String,
}

impl Channels {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            prefix: project.into(),
        }
    }

    pub fn project(&self) -> &str {
        &self.prefix
    }

    /// Full channel name for a suffix such as [`JOBS_CREATED`].
    pub fn name(&self, suffix: &str) -> String {
        format!("{}:{suffix}", self.prefix)
    }

    /// Full names of every subscribed channel.
    pub fn all(&self) -> Vec<String> {
        ALL.iter().map(|suffix| self.name(suffix)).collect()
    }

    /// Strip the project prefix, returning `None` for foreign channels.
    pub fn suffix<'a>(&self, channel: &'a str) -> Option<&'a str> {
        channel
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
    }

    /// Redis key holding a stored notification envelope.
    pub fn notification_key(&self, id: &str) -> String {
        format!("{}:notification:{id}", self.prefix)
    }
}
