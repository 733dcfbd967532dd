//! Job queue store and execution-log sink boundaries.
//!
//! Both are external collaborators; the in-memory implementations back
//! tests and single-process embeddings.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};

use crate::journey::StepRecord;

use super::job::{Job, JobStatus};

/// Store/sink failure.
#[derive(Error, Debug)]
#[error("Store error: {0}")]
pub struct StoreError(pub String);

/// Queue-row access used by the orchestrator.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Fetch due pending jobs, ordered by priority descending then
    /// scheduled time ascending, capped at `limit`.
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<Job>, StoreError>;

    async fn mark_running(&self, job_id: &str) -> Result<(), StoreError>;

    /// Write the terminal status plus the merged result payload.
    async fn persist_result(
        &self,
        job_id: &str,
        status: JobStatus,
        result: serde_json::Value,
        error: Option<String>,
    ) -> Result<(), StoreError>;

    /// Force-fail jobs stuck in running longer than `older_than`.
    /// Crash-recovery sweep: no job may remain running forever.
    async fn fail_stale(&self, older_than: Duration) -> Result<usize, StoreError>;
}

/// Append-only sink for per-job execution logs.
#[async_trait]
pub trait ExecutionLogSink: Send + Sync {
    async fn append(&self, job_id: &str, steps: &[StepRecord]) -> Result<(), StoreError>;
}

/// In-memory job store.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, Job>>,
    running_since: Mutex<HashMap<String, Instant>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Job) {
        self.jobs.lock().insert(job.id.clone(), job);
    }

    pub fn get(&self, job_id: &str) -> Option<Job> {
        self.jobs.lock().get(job_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Mark a job as running since `instant` - for staleness tests.
    pub fn set_running_since(&self, job_id: &str, instant: Instant) {
        self.running_since.lock().insert(job_id.to_string(), instant);
        if let Some(job) = self.jobs.lock().get_mut(job_id) {
            job.status = JobStatus::Running;
        }
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<Job>, StoreError> {
        let now = Utc::now();
        let jobs = self.jobs.lock();

        let mut due: Vec<Job> = jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending && j.scheduled_at <= now)
            .cloned()
            .collect();

        due.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.scheduled_at.cmp(&b.scheduled_at))
        });
        due.truncate(limit);

        Ok(due)
    }

    async fn mark_running(&self, job_id: &str) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError(format!("unknown job {job_id}")))?;

        job.status = JobStatus::Running;
        job.updated_at = Utc::now();
        self.running_since.lock().insert(job_id.to_string(), Instant::now());
        Ok(())
    }

    async fn persist_result(
        &self,
        job_id: &str,
        status: JobStatus,
        result: serde_json::Value,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError(format!("unknown job {job_id}")))?;

        job.status = status;
        job.last_result = Some(result);
        job.error = error;
        job.updated_at = Utc::now();
        self.running_since.lock().remove(job_id);
        Ok(())
    }

    async fn fail_stale(&self, older_than: Duration) -> Result<usize, StoreError> {
        let stale: Vec<String> = {
            let running = self.running_since.lock();
            running
                .iter()
                .filter(|(_, since)| since.elapsed() > older_than)
                .map(|(id, _)| id.clone())
                .collect()
        };

        let mut jobs = self.jobs.lock();
        let mut count = 0;
        for id in stale {
            if let Some(job) = jobs.get_mut(&id) {
                if job.status == JobStatus::Running {
                    warn!("Force-failing stale running job {}", id);
                    job.status = JobStatus::Failed;
                    job.error = Some("stale running job recovered".to_string());
                    job.updated_at = Utc::now();
                    count += 1;
                }
            }
            self.running_since.lock().remove(&id);
        }

        if count > 0 {
            info!("Recovered {} stale running jobs", count);
        }
        Ok(count)
    }
}

/// In-memory log sink.
#[derive(Default)]
pub struct MemoryLogSink {
    entries: Mutex<Vec<(String, Vec<StepRecord>)>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries_for(&self, job_id: &str) -> Vec<Vec<StepRecord>> {
        self.entries
            .lock()
            .iter()
            .filter(|(id, _)| id == job_id)
            .map(|(_, steps)| steps.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl ExecutionLogSink for MemoryLogSink {
    async fn append(&self, job_id: &str, steps: &[StepRecord]) -> Result<(), StoreError> {
        self.entries
            .lock()
            .push((job_id.to_string(), steps.to_vec()));
        Ok(())
    }
}

/// Discards every log write.
pub struct NullLogSink;

#[async_trait]
impl ExecutionLogSink for NullLogSink {
    async fn append(&self, _job_id: &str, _steps: &[StepRecord]) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_fetch_orders_by_priority_then_schedule() {
        let store = MemoryJobStore::new();

        let mut low = Job::pending("low", serde_json::json!({}), 1);
        low.scheduled_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut high = Job::pending("high", serde_json::json!({}), 5);
        high.scheduled_at = Utc.timestamp_opt(1_700_000_100, 0).unwrap();
        let mut high_earlier = Job::pending("high-earlier", serde_json::json!({}), 5);
        high_earlier.scheduled_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        store.insert(low);
        store.insert(high);
        store.insert(high_earlier);

        let fetched = store.fetch_pending(10).await.unwrap();
        let ids: Vec<&str> = fetched.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, ["high-earlier", "high", "low"]);
    }

    #[tokio::test]
    async fn test_fetch_respects_capacity_and_due_time() {
        let store = MemoryJobStore::new();
        store.insert(Job::pending("a", serde_json::json!({}), 1));
        store.insert(Job::pending("b", serde_json::json!({}), 2));

        let mut future = Job::pending("future", serde_json::json!({}), 9);
        future.scheduled_at = Utc::now() + chrono::Duration::hours(1);
        store.insert(future);

        let fetched = store.fetch_pending(1).await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id, "b");
    }

    #[tokio::test]
    async fn test_fail_stale_only_hits_old_running_jobs() {
        let store = MemoryJobStore::new();
        store.insert(Job::pending("fresh", serde_json::json!({}), 0));
        store.insert(Job::pending("stale", serde_json::json!({}), 0));

        store.mark_running("fresh").await.unwrap();
        store.set_running_since("stale", Instant::now() - Duration::from_secs(700));

        let recovered = store.fail_stale(Duration::from_secs(600)).await.unwrap();
        assert_eq!(recovered, 1);
        assert_eq!(store.get("stale").unwrap().status, JobStatus::Failed);
        assert_eq!(store.get("fresh").unwrap().status, JobStatus::Running);
    }
}
