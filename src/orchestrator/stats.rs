//! Lock-free run statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters aggregated across all processed jobs.
#[derive(Debug, Default)]
pub struct RunStats {
    pub jobs_completed: AtomicU64,
    pub jobs_failed: AtomicU64,
    pub targets_found: AtomicU64,
    pub captcha_retries: AtomicU64,
    pub timeouts: AtomicU64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_completed(&self, found: bool) {
        self.jobs_completed.fetch_add(1, Ordering::Relaxed);
        if found {
            self.targets_found.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_failed(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_captcha_retry(&self) {
        self.captcha_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot for serialization
    pub fn snapshot(&self) -> RunStatsSnapshot {
        RunStatsSnapshot {
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            targets_found: self.targets_found.load(Ordering::Relaxed),
            captcha_retries: self.captcha_retries.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }
}

/// Serializable snapshot of run stats
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatsSnapshot {
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub targets_found: u64,
    pub captcha_retries: u64,
    pub timeouts: u64,
}
