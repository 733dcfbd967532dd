//! Job model and result merging.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::journey::{JourneyRequest, JourneyResult, JourneyVariant};
use crate::scoring::TargetSpec;
use crate::DeviceClass;

/// Queue-row lifecycle. Terminal once completed or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One queued journey job. Created externally; mutated only by the
/// orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    /// Arbitrary keyed parameter set, preserved verbatim on persistence.
    pub params: serde_json::Value,
    pub status: JobStatus,
    pub priority: i32,
    pub scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Merged result payload of the last execution.
    pub last_result: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl Job {
    /// A pending job due now, for embedding and tests.
    pub fn pending(id: &str, params: serde_json::Value, priority: i32) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            params,
            status: JobStatus::Pending,
            priority,
            scheduled_at: now,
            created_at: now,
            updated_at: now,
            last_result: None,
            error: None,
        }
    }
}

/// Typed view over the known job parameters. Unknown keys stay in the raw
/// parameter map and survive persistence untouched.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobParams {
    pub keyword: String,
    pub target_business: String,
    pub target_domain: String,
    pub device: DeviceClass,
    pub country_hint: Option<String>,
    pub dwell_secs: Option<u64>,
    pub wildcard_match: bool,
    pub journey: JourneyVariant,
}

impl Default for JobParams {
    fn default() -> Self {
        Self {
            keyword: String::new(),
            target_business: String::new(),
            target_domain: String::new(),
            device: DeviceClass::Desktop,
            country_hint: None,
            dwell_secs: None,
            wildcard_match: false,
            journey: JourneyVariant::Organic,
        }
    }
}

impl JobParams {
    /// Parse the typed view out of a job's raw parameter map.
    pub fn from_value(params: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(params.clone())
    }

    /// Build the driver request for this job.
    pub fn to_request(&self) -> JourneyRequest {
        JourneyRequest {
            keyword: self.keyword.clone(),
            target: TargetSpec::new(&self.target_business, &self.target_domain)
                .with_wildcard(self.wildcard_match),
            device: self.device,
            variant: self.journey,
            country_hint: self.country_hint.clone(),
            dwell_secs: self.dwell_secs,
        }
    }
}

/// Merge a journey result with the original job parameters.
///
/// One explicit rule: journey output supplies the outcome fields, the
/// original parameters win every collision - so a restart with the same
/// parameters stays possible even if the journey mutated or dropped them.
pub fn merge_result(params: &serde_json::Value, result: &JourneyResult) -> serde_json::Value {
    let mut merged = serde_json::to_value(result).unwrap_or_else(|_| serde_json::json!({}));

    if let (Some(merged_map), Some(param_map)) = (merged.as_object_mut(), params.as_object()) {
        for (key, value) in param_map {
            merged_map.insert(key.clone(), value.clone());
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journey::JourneyOutcome;

    #[test]
    fn test_params_from_value_with_extensions() {
        let value = serde_json::json!({
            "keyword": "joe's pizza springfield",
            "targetBusiness": "Joe's Pizza",
            "targetDomain": "joespizza.com",
            "device": "mobile",
            "wildcardMatch": true,
            "journey": "localMixed",
            "campaignTag": "spring-promo"
        });

        let params = JobParams::from_value(&value).unwrap();
        assert_eq!(params.keyword, "joe's pizza springfield");
        assert_eq!(params.device, DeviceClass::Mobile);
        assert!(params.wildcard_match);
        assert_eq!(params.journey, JourneyVariant::LocalMixed);
    }

    #[test]
    fn test_params_defaults() {
        let params = JobParams::from_value(&serde_json::json!({"keyword": "x"})).unwrap();
        assert_eq!(params.device, DeviceClass::Desktop);
        assert_eq!(params.journey, JourneyVariant::Organic);
        assert!(!params.wildcard_match);
    }

    #[test]
    fn test_merge_preserves_original_identity_fields() {
        let params = serde_json::json!({
            "keyword": "original keyword",
            "targetDomain": "joespizza.com",
            "campaignTag": "spring-promo"
        });

        let outcome = JourneyOutcome { found: true, clicked_rank: 3, dwell_ms: 30_000 };
        let log = crate::journey::ExecutionLog::new();
        let result = JourneyResult::from_outcome(&outcome, 42_000, 1, &log);

        let merged = merge_result(&params, &result);

        // Outcome fields come from the journey.
        assert_eq!(merged["found"], serde_json::json!(true));
        assert_eq!(merged["clickedRank"], serde_json::json!(3));
        // Identity and extension fields survive verbatim.
        assert_eq!(merged["keyword"], serde_json::json!("original keyword"));
        assert_eq!(merged["campaignTag"], serde_json::json!("spring-promo"));
    }

    #[test]
    fn test_merge_params_win_collisions() {
        // A journey echoing a mutated keyword must not clobber the original.
        let params = serde_json::json!({ "error": "keep-me", "keyword": "original" });
        let outcome = JourneyOutcome::not_found();
        let log = crate::journey::ExecutionLog::new();
        let result = JourneyResult::from_outcome(&outcome, 1000, 1, &log);

        let merged = merge_result(&params, &result);
        assert_eq!(merged["error"], serde_json::json!("keep-me"));
    }
}
