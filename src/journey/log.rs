//! Execution log.
//!
//! Ordered, append-only record of what a journey did and when. Persisted
//! for audit after the run; never consulted by the engine itself.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// One logged step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub action: String,
    pub elapsed_ms: u64,
    pub detail: String,
}

/// Append-only journey log, timed from construction.
#[derive(Debug)]
pub struct ExecutionLog {
    started: Instant,
    steps: Vec<StepRecord>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            steps: Vec::new(),
        }
    }

    /// Append a step stamped with elapsed time since the log started.
    pub fn record(&mut self, action: &str, detail: impl Into<String>) {
        self.steps.push(StepRecord {
            action: action.to_string(),
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            detail: detail.into(),
        });
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for ExecutionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_are_ordered_and_timed() {
        let mut log = ExecutionLog::new();
        log.record("search.begin", "coffee near me");
        log.record("scan.match", "rank 3");

        assert_eq!(log.len(), 2);
        assert_eq!(log.steps()[0].action, "search.begin");
        assert!(log.steps()[1].elapsed_ms >= log.steps()[0].elapsed_ms);
    }
}
