use std::time::Duration;

use beacon_core::channels::Channels;

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub redis_url: String,
    /// Prefix for Redis channels and keys (default: `beacon`).
    pub project_name: String,
    /// Interval between scheduled passes (default: 10 s).
    pub poll_interval: Duration,
    /// Age after which finished jobs are deleted (default: 168 h).
    pub retention_hours: i64,
    /// TTL of notification envelopes stored by the `notify` handler.
    pub notification_ttl_secs: u64,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                  |
    /// |-----------------------------|--------------------------|
    /// | `DATABASE_URL`              | **required**             |
    /// | `REDIS_URL`                 | `redis://127.0.0.1:6379` |
    /// | `PROJECT_NAME`              | `beacon`                 |
    /// | `WORKER_POLL_INTERVAL_SECS` | `10`                     |
    /// | `JOB_RETENTION_HOURS`       | `168`                    |
    /// | `NOTIFICATION_TTL_SECS`     | `60`                     |
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());

        let project_name = std::env::var("PROJECT_NAME").unwrap_or_else(|_| "beacon".into());

        let poll_interval_secs: u64 = std::env::var("WORKER_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("WORKER_POLL_INTERVAL_SECS must be a valid u64");

        let retention_hours: i64 = std::env::var("JOB_RETENTION_HOURS")
            .unwrap_or_else(|_| "168".into())
            .parse()
            .expect("JOB_RETENTION_HOURS must be a valid i64");

        let notification_ttl_secs: u64 = std::env::var("NOTIFICATION_TTL_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("NOTIFICATION_TTL_SECS must be a valid u64");

        Self {
            database_url,
            redis_url,
            project_name,
            poll_interval: Duration::from_secs(poll_interval_secs.max(1)),
            retention_hours,
            notification_ttl_secs,
        }
    }

    pub fn channels(&self) -> Channels {
        Channels::new(self.project_name.clone())
    }
}
