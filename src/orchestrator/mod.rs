//! Job orchestration module
//!
//! Pulls pending jobs within a concurrency budget, wraps each execution in
//! a deadline, retries CAPTCHA-flagged attempts with a fresh identity, and
//! always persists a terminal result - no job row is ever left running.

mod job;
mod queue;
mod runner;
mod stats;

pub use job::{merge_result, Job, JobParams, JobStatus};
pub use queue::{ExecutionLogSink, JobStore, MemoryJobStore, MemoryLogSink, NullLogSink, StoreError};
pub use runner::{Orchestrator, OrchestratorConfig};
pub use stats::{RunStats, RunStatsSnapshot};
