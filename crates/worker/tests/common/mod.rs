//! In-memory fakes shared by the worker integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use beacon_core::job::{Readiness, Schedule};
use beacon_core::notification::Notification;
use beacon_core::types::{DbId, Timestamp};
use beacon_db::models::job::{Job, ProcessedJobs, SaveJob};
use beacon_db::models::status::JobStatus;
use beacon_events::store::envelope;
use beacon_events::{EventError, NotificationStore};
use beacon_worker::store::JobStore;
use chrono::{Duration, Utc};

/// [`JobStore`] over a mutex-guarded map, following the Postgres semantics.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<BTreeMap<DbId, Job>>,
    next_id: Mutex<DbId>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_of(&self, id: DbId) -> Option<JobStatus> {
        self.jobs.lock().unwrap().get(&id).and_then(Job::status)
    }

    pub fn get(&self, id: DbId) -> Option<Job> {
        self.jobs.lock().unwrap().get(&id).cloned()
    }

    /// Force a status, bypassing transition rules.
    pub fn set_status(&self, id: DbId, status: JobStatus) {
        if let Some(job) = self.jobs.lock().unwrap().get_mut(&id) {
            job.status_id = status.id();
        }
    }

    fn finish(&self, id: DbId, status: JobStatus, output: &serde_json::Value) -> bool {
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.get_mut(&id) {
            Some(job) if job.status() == Some(JobStatus::Started) => {
                job.status_id = status.id();
                job.output_data = Some(output.clone());
                job.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }
}

fn is_finished(job: &Job) -> bool {
    job.status().is_some_and(JobStatus::is_terminal)
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn save(&self, job: &SaveJob) -> Result<DbId, sqlx::Error> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().unwrap();
        let id = match job.id {
            Some(id) if jobs.get(&id).is_some_and(|j| !is_finished(j)) => id,
            Some(_) => return Err(sqlx::Error::RowNotFound),
            None => {
                let mut next = self.next_id.lock().unwrap();
                *next += 1;
                *next
            }
        };
        let created_at = jobs.get(&id).map(|j| j.created_at).unwrap_or(now);
        jobs.insert(
            id,
            Job {
                id,
                name: job.name.clone(),
                status_id: job.status.id(),
                input_data: job.input_data.clone(),
                output_data: job.output_data.clone(),
                scheduled_for: job.schedule.scheduled_for(),
                valid_until: job.schedule.valid_until(),
                created_at,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn find(&self, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        Ok(self.get(id))
    }

    async fn find_all(&self) -> Result<Vec<Job>, sqlx::Error> {
        Ok(self.jobs.lock().unwrap().values().cloned().collect())
    }

    async fn delete(&self, id: DbId) -> Result<bool, sqlx::Error> {
        Ok(self.jobs.lock().unwrap().remove(&id).is_some())
    }

    async fn restart_interrupted(&self) -> Result<u64, sqlx::Error> {
        let mut count = 0;
        for job in self.jobs.lock().unwrap().values_mut() {
            if job.status() == Some(JobStatus::Started) {
                job.status_id = JobStatus::Created.id();
                count += 1;
            }
        }
        Ok(count)
    }

    async fn process_new_jobs(&self, now: Timestamp) -> Result<ProcessedJobs, sqlx::Error> {
        let mut jobs = self.jobs.lock().unwrap();
        let mut processed = ProcessedJobs::default();

        let created: Vec<DbId> = jobs
            .values()
            .filter(|job| job.status() == Some(JobStatus::Created))
            .map(|job| job.id)
            .collect();

        for id in created {
            let readiness = jobs[&id].schedule().readiness(now);
            match readiness {
                Readiness::Due => {
                    let job = jobs.get_mut(&id).unwrap();
                    job.status_id = JobStatus::Started.id();
                    processed.started.push(job.clone());
                }
                Readiness::Expired => {
                    processed.expired.extend(jobs.remove(&id));
                }
                Readiness::Pending => {}
            }
        }
        Ok(processed)
    }

    async fn mark_success(
        &self,
        id: DbId,
        output: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        Ok(self.finish(id, JobStatus::Success, output))
    }

    async fn mark_failure(
        &self,
        id: DbId,
        output: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        Ok(self.finish(id, JobStatus::Failure, output))
    }
}

/// [`NotificationStore`] without expiry.
#[derive(Default)]
pub struct MemoryNotificationStore {
    entries: Mutex<HashMap<String, Notification>>,
}

impl MemoryNotificationStore {
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn put(&self, notification: &Notification) -> Result<String, EventError> {
        let (id, body) = envelope(notification)?;
        let stored: Notification = serde_json::from_str(&body)?;
        self.entries.lock().unwrap().insert(id.clone(), stored);
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<Notification>, EventError> {
        Ok(self.entries.lock().unwrap().get(id).cloned())
    }
}

/// A job window relative to now.
pub fn window(starts_in: Duration, lasts: Duration) -> Schedule {
    Schedule::starting_at(Utc::now() + starts_in, lasts).unwrap()
}

pub fn new_job(name: &str, input: serde_json::Value, schedule: Schedule) -> SaveJob {
    SaveJob::new(name, input, schedule)
}
