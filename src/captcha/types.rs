//! CAPTCHA types and solving-service API models.

use serde::{Deserialize, Serialize};

use crate::engine::Cookie;
use crate::proxy::ProxyEndpoint;

/// Supported challenge types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeKind {
    RecaptchaV2,
    /// The variant interstitial challenge pages serve.
    RecaptchaV2Enterprise,
    Turnstile,
}

impl ChallengeKind {
    /// Token time-to-live in seconds
    pub fn token_ttl_secs(&self) -> u64 {
        match self {
            Self::RecaptchaV2 | Self::RecaptchaV2Enterprise => 120,
            Self::Turnstile => 300,
        }
    }

    /// Safe TTL with margin for network delays
    pub fn safe_token_ttl_secs(&self) -> u64 {
        const SAFETY_MARGIN: u64 = 15;
        self.token_ttl_secs().saturating_sub(SAFETY_MARGIN)
    }
}

/// Everything the solving service needs for one challenge. Lives only for
/// the duration of one resolution attempt.
#[derive(Debug, Clone)]
pub struct ChallengeSubmission {
    pub kind: ChallengeKind,
    pub site_key: String,
    pub page_url: String,
    /// Supplementary server token some challenge pages embed.
    pub data_s: Option<String>,
    /// Egress the browser session is using; the solver should solve from
    /// the same exit to keep the token plausible.
    pub proxy: Option<ProxyEndpoint>,
    pub cookies: Vec<Cookie>,
    pub user_agent: Option<String>,
}

impl ChallengeSubmission {
    pub fn recaptcha_v2_enterprise(site_key: &str, page_url: &str) -> Self {
        Self {
            kind: ChallengeKind::RecaptchaV2Enterprise,
            site_key: site_key.to_string(),
            page_url: page_url.to_string(),
            data_s: None,
            proxy: None,
            cookies: Vec::new(),
            user_agent: None,
        }
    }

    pub fn with_data_s(mut self, data_s: Option<String>) -> Self {
        self.data_s = data_s;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<ProxyEndpoint>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_cookies(mut self, cookies: Vec<Cookie>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Cookie header form the solving service expects.
    pub fn cookie_string(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Identifier of an in-flight solving task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskId(pub i64);

/// Poll outcome for a solving task.
#[derive(Debug, Clone)]
pub enum SolveStatus {
    Pending,
    Ready(String),
}

/// A solved token plus how long the service took.
#[derive(Debug, Clone)]
pub struct SolvedToken {
    pub token: String,
    pub solve_time_ms: u64,
}

// ========== Solving-service API models ==========

/// Create-task request envelope
#[derive(Debug, Serialize)]
pub struct SolverCreateTask {
    #[serde(rename = "clientKey")]
    pub client_key: String,
    pub task: SolverTask,
}

/// Task payloads understood by the solving service
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum SolverTask {
    #[serde(rename = "RecaptchaV2TaskProxyless")]
    RecaptchaV2Proxyless {
        #[serde(rename = "websiteURL")]
        website_url: String,
        #[serde(rename = "websiteKey")]
        website_key: String,
    },

    #[serde(rename = "RecaptchaV2EnterpriseTaskProxyless")]
    RecaptchaV2EnterpriseProxyless {
        #[serde(rename = "websiteURL")]
        website_url: String,
        #[serde(rename = "websiteKey")]
        website_key: String,
        #[serde(rename = "enterprisePayload", skip_serializing_if = "Option::is_none")]
        enterprise_payload: Option<serde_json::Value>,
    },

    /// In-proxy variant: the service solves from the session's own egress.
    #[serde(rename = "RecaptchaV2EnterpriseTask")]
    RecaptchaV2Enterprise {
        #[serde(rename = "websiteURL")]
        website_url: String,
        #[serde(rename = "websiteKey")]
        website_key: String,
        #[serde(rename = "enterprisePayload", skip_serializing_if = "Option::is_none")]
        enterprise_payload: Option<serde_json::Value>,
        #[serde(rename = "proxyType")]
        proxy_type: String,
        #[serde(rename = "proxyAddress")]
        proxy_address: String,
        #[serde(rename = "proxyPort")]
        proxy_port: u16,
        #[serde(rename = "proxyLogin")]
        proxy_login: String,
        #[serde(rename = "proxyPassword")]
        proxy_password: String,
        #[serde(rename = "userAgent", skip_serializing_if = "Option::is_none")]
        user_agent: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        cookies: Option<String>,
    },

    #[serde(rename = "TurnstileTaskProxyless")]
    TurnstileProxyless {
        #[serde(rename = "websiteURL")]
        website_url: String,
        #[serde(rename = "websiteKey")]
        website_key: String,
    },
}

/// Create-task response
#[derive(Debug, Deserialize)]
pub struct SolverCreateResponse {
    #[serde(rename = "errorId")]
    pub error_id: i32,
    #[serde(rename = "errorCode")]
    pub error_code: Option<String>,
    #[serde(rename = "errorDescription")]
    pub error_description: Option<String>,
    #[serde(rename = "taskId")]
    pub task_id: Option<i64>,
}

/// Get-result request
#[derive(Debug, Serialize)]
pub struct SolverGetResult {
    #[serde(rename = "clientKey")]
    pub client_key: String,
    #[serde(rename = "taskId")]
    pub task_id: i64,
}

/// Get-result response
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SolverResultResponse {
    #[serde(rename = "errorId")]
    pub error_id: i32,
    #[serde(rename = "errorCode")]
    pub error_code: Option<String>,
    #[serde(rename = "errorDescription")]
    pub error_description: Option<String>,
    pub status: Option<String>,
    pub solution: Option<SolverSolution>,
}

impl SolverResultResponse {
    pub fn is_processing(&self) -> bool {
        self.status.as_deref() == Some("processing")
    }

    pub fn is_ready(&self) -> bool {
        self.status.as_deref() == Some("ready")
    }

    pub fn get_token(&self) -> Option<&str> {
        self.solution.as_ref().and_then(|s| {
            s.g_recaptcha_response
                .as_deref()
                .or(s.token.as_deref())
                .or(s.text.as_deref())
        })
    }
}

/// Solution payload
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SolverSolution {
    #[serde(rename = "gRecaptchaResponse")]
    pub g_recaptcha_response: Option<String>,
    pub token: Option<String>,
    pub text: Option<String>,
}

/// CAPTCHA error types
#[derive(Debug, thiserror::Error)]
pub enum CaptchaError {
    #[error("API key not configured")]
    ApiKeyMissing,

    #[error("Solving service error: {0}")]
    ApiError(String),

    #[error("Task creation failed: {0}")]
    TaskCreationFailed(String),

    #[error("Solve timeout after {0}s")]
    Timeout(u64),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Page error during resolution: {0}")]
    Page(String),
}

impl From<crate::engine::PageError> for CaptchaError {
    fn from(err: crate::engine::PageError) -> Self {
        CaptchaError::Page(err.to_string())
    }
}
