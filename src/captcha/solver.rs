//! Solving-service client.
//!
//! Async submit/poll protocol against a 2Captcha-compatible API. The
//! `TokenSolver` trait keeps the resolver testable without network access.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::timing;

use super::types::*;

/// Solving-service API base URL
const SOLVER_API: &str = "https://api.2captcha.com";

/// Async submit/poll interface to an external solving service.
#[async_trait]
pub trait TokenSolver: Send + Sync {
    /// Submit a challenge; returns the service-side task identifier.
    async fn submit(&self, challenge: &ChallengeSubmission) -> Result<TaskId, CaptchaError>;

    /// Poll a previously submitted task.
    async fn poll(&self, task: TaskId) -> Result<SolveStatus, CaptchaError>;
}

/// Submit a challenge and poll at a fixed interval up to `max_polls`
/// attempts. Failure to resolve within the budget is a hard error for
/// this attempt.
pub async fn solve(
    solver: &dyn TokenSolver,
    challenge: &ChallengeSubmission,
    poll_interval: Duration,
    max_polls: u32,
) -> Result<SolvedToken, CaptchaError> {
    let start = Instant::now();

    info!(
        "Solving {:?} challenge for {}",
        challenge.kind, challenge.page_url
    );

    let task_id = solver.submit(challenge).await?;
    debug!("Created solving task ID: {}", task_id.0);

    for _ in 0..max_polls {
        timing::pause(poll_interval).await;

        match solver.poll(task_id).await? {
            SolveStatus::Ready(token) => {
                let solve_time_ms = start.elapsed().as_millis() as u64;
                info!("Challenge solved in {}ms", solve_time_ms);
                if solve_time_ms / 1000 > challenge.kind.safe_token_ttl_secs() {
                    debug!("Solve time exceeded safe token TTL; token may be stale");
                }
                return Ok(SolvedToken { token, solve_time_ms });
            }
            SolveStatus::Pending => {
                debug!("Task {} still processing...", task_id.0);
            }
        }
    }

    Err(CaptchaError::Timeout(
        (poll_interval.as_secs()).saturating_mul(max_polls as u64),
    ))
}

/// Client for a 2Captcha-compatible solving service.
pub struct TwoCaptchaClient {
    api_key: String,
    client: Client,
}

impl TwoCaptchaClient {
    /// Create a new solving-service client
    pub fn new(api_key: &str) -> Result<Self, CaptchaError> {
        if api_key.is_empty() {
            return Err(CaptchaError::ApiKeyMissing);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CaptchaError::NetworkError(e.to_string()))?;

        Ok(Self {
            api_key: api_key.to_string(),
            client,
        })
    }

    /// Get account balance from the solving service
    pub async fn balance(&self) -> Result<f64, CaptchaError> {
        let url = format!(
            "https://2captcha.com/res.php?key={}&action=getbalance&json=1",
            self.api_key
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CaptchaError::NetworkError(e.to_string()))?;

        let text = response
            .text()
            .await
            .map_err(|e| CaptchaError::NetworkError(e.to_string()))?;

        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&text) {
            if let Some(balance) = json.get("request").and_then(|v| v.as_str()) {
                return balance.parse().map_err(|_| CaptchaError::InvalidResponse(text));
            }
            if let Some(balance) = json.get("balance").and_then(|v| v.as_f64()) {
                return Ok(balance);
            }
        }

        text.trim().parse().map_err(|_| CaptchaError::InvalidResponse(text))
    }

    fn build_task(&self, challenge: &ChallengeSubmission) -> SolverTask {
        let enterprise_payload = challenge
            .data_s
            .as_ref()
            .map(|s| serde_json::json!({ "s": s }));

        match (challenge.kind, challenge.proxy.as_ref()) {
            (ChallengeKind::RecaptchaV2, _) => SolverTask::RecaptchaV2Proxyless {
                website_url: challenge.page_url.clone(),
                website_key: challenge.site_key.clone(),
            },
            (ChallengeKind::RecaptchaV2Enterprise, Some(proxy)) => {
                SolverTask::RecaptchaV2Enterprise {
                    website_url: challenge.page_url.clone(),
                    website_key: challenge.site_key.clone(),
                    enterprise_payload,
                    proxy_type: proxy.scheme.to_uppercase(),
                    proxy_address: proxy.host.clone(),
                    proxy_port: proxy.port,
                    proxy_login: proxy.username.clone(),
                    proxy_password: proxy.password.clone(),
                    user_agent: challenge.user_agent.clone(),
                    cookies: challenge.cookie_string(),
                }
            }
            (ChallengeKind::RecaptchaV2Enterprise, None) => {
                SolverTask::RecaptchaV2EnterpriseProxyless {
                    website_url: challenge.page_url.clone(),
                    website_key: challenge.site_key.clone(),
                    enterprise_payload,
                }
            }
            (ChallengeKind::Turnstile, _) => SolverTask::TurnstileProxyless {
                website_url: challenge.page_url.clone(),
                website_key: challenge.site_key.clone(),
            },
        }
    }
}

#[async_trait]
impl TokenSolver for TwoCaptchaClient {
    async fn submit(&self, challenge: &ChallengeSubmission) -> Result<TaskId, CaptchaError> {
        let url = format!("{}/createTask", SOLVER_API);

        let create_request = SolverCreateTask {
            client_key: self.api_key.clone(),
            task: self.build_task(challenge),
        };

        debug!(
            "createTask request: kind={:?}, url={}, sitekey={}..., proxied={}",
            challenge.kind,
            &challenge.page_url[..challenge.page_url.len().min(80)],
            &challenge.site_key[..challenge.site_key.len().min(20)],
            challenge.proxy.is_some()
        );

        let response = self
            .client
            .post(&url)
            .json(&create_request)
            .send()
            .await
            .map_err(|e| CaptchaError::NetworkError(e.to_string()))?;

        let response_text = response
            .text()
            .await
            .map_err(|e| CaptchaError::NetworkError(e.to_string()))?;

        debug!("createTask response: {}", &response_text[..response_text.len().min(500)]);

        let result: SolverCreateResponse = serde_json::from_str(&response_text).map_err(|e| {
            CaptchaError::InvalidResponse(format!(
                "Parse error: {} - Response: {}",
                e,
                &response_text[..response_text.len().min(200)]
            ))
        })?;

        if result.error_id != 0 {
            let error_msg = format!(
                "errorId={}, code={}, desc={}",
                result.error_id,
                result.error_code.as_deref().unwrap_or("none"),
                result.error_description.as_deref().unwrap_or("none")
            );
            info!("Solving task creation failed: {}", error_msg);
            return Err(CaptchaError::TaskCreationFailed(error_msg));
        }

        let task_id = result
            .task_id
            .ok_or_else(|| CaptchaError::InvalidResponse("No task ID in response".into()))?;
        info!("Solving task created: ID={}", task_id);
        Ok(TaskId(task_id))
    }

    async fn poll(&self, task: TaskId) -> Result<SolveStatus, CaptchaError> {
        let url = format!("{}/getTaskResult", SOLVER_API);

        let request = SolverGetResult {
            client_key: self.api_key.clone(),
            task_id: task.0,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CaptchaError::NetworkError(e.to_string()))?;

        let result: SolverResultResponse = response
            .json()
            .await
            .map_err(|e| CaptchaError::InvalidResponse(e.to_string()))?;

        if result.error_id != 0 {
            let error_msg = result
                .error_description
                .or(result.error_code)
                .unwrap_or_else(|| format!("Error ID: {}", result.error_id));
            return Err(CaptchaError::ApiError(error_msg));
        }

        if result.is_ready() {
            if let Some(token) = result.get_token() {
                return Ok(SolveStatus::Ready(token.to_string()));
            }
        }

        Ok(SolveStatus::Pending)
    }
}
