//! Journey inputs and outcomes.

use serde::{Deserialize, Serialize};

use crate::scoring::TargetSpec;
use crate::DeviceClass;

use super::log::{ExecutionLog, StepRecord};
use super::profile::JourneyVariant;

/// The typed view of a job the driver runs against.
#[derive(Debug, Clone)]
pub struct JourneyRequest {
    pub keyword: String,
    pub target: TargetSpec,
    pub device: DeviceClass,
    pub variant: JourneyVariant,
    /// Per-job geographic hint (country code).
    pub country_hint: Option<String>,
    /// Requested on-page dwell time in seconds.
    pub dwell_secs: Option<u64>,
}

/// What one attempt produced before the orchestrator wraps it up.
#[derive(Debug, Clone)]
pub struct JourneyOutcome {
    pub found: bool,
    /// 1-based presentation rank of the clicked result, 0 when none.
    pub clicked_rank: u32,
    pub dwell_ms: u64,
}

impl JourneyOutcome {
    pub fn not_found() -> Self {
        Self { found: false, clicked_rank: 0, dwell_ms: 0 }
    }
}

/// The immutable result of one job execution, merged with the original
/// job parameters by the orchestrator before persistence.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyResult {
    pub success: bool,
    pub found: bool,
    /// 1-based rank of the clicked result, 0 when nothing was clicked.
    pub clicked_rank: u32,
    pub duration_ms: u64,
    /// Structured error string, present on failure.
    pub error: Option<String>,
    /// Whether the final attempt ended on a CAPTCHA-class failure.
    pub captcha_flagged: bool,
    /// Attempts consumed (1..=max).
    pub attempts: u32,
    /// Ordered execution log of the last attempt.
    pub log: Vec<StepRecord>,
}

impl JourneyResult {
    pub fn from_outcome(outcome: &JourneyOutcome, duration_ms: u64, attempts: u32, log: &ExecutionLog) -> Self {
        Self {
            success: true,
            found: outcome.found,
            clicked_rank: outcome.clicked_rank,
            duration_ms,
            error: None,
            captcha_flagged: false,
            attempts,
            log: log.steps().to_vec(),
        }
    }

    pub fn from_error(
        error: &crate::error::JourneyError,
        duration_ms: u64,
        attempts: u32,
        log: &ExecutionLog,
    ) -> Self {
        Self {
            success: false,
            found: false,
            clicked_rank: 0,
            duration_ms,
            error: Some(error.to_string()),
            captcha_flagged: error.is_captcha_flag(),
            attempts,
            log: log.steps().to_vec(),
        }
    }
}
