//! Challenge-page state machine.
//!
//! `Clear -> Challenged -> Solving -> Resubmitted -> {Clear | Challenged |
//! Blocked}` with a fixed cycle budget. A challenge page without a
//! solvable widget is an IP-level block and terminates immediately; a
//! stale challenge is never re-submitted - each retry cycle reloads the
//! page for a fresh one.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use tracing::{debug, info, warn};

use crate::engine::{PageSnapshot, SearchPage};
use crate::proxy::ProxyEndpoint;
use crate::timing::{self, Randomizer};

use super::solver::{solve, TokenSolver};
use super::types::{CaptchaError, ChallengeKind, ChallengeSubmission};

/// States of one resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaState {
    Clear,
    Challenged,
    Solving,
    Resubmitted,
    Blocked,
}

/// Terminal outcome of a resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaVerdict {
    /// No challenge was present.
    Clear,
    /// Challenge solved and the page redirected away.
    Solved,
    /// Challenge page with no solvable widget: the egress IP is burned.
    Blocked,
    /// Cycle budget exhausted; the identity stays challenged.
    Unresolved,
}

/// Tunables for the resolution loop.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptchaConfig {
    /// Full detect-solve-resubmit cycles before giving up.
    pub max_cycles: u32,
    /// Fixed solving-service poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Poll attempts before a solve is abandoned.
    pub max_polls: u32,
    /// Interval between post-resubmit redirect checks.
    pub redirect_poll_ms: u64,
    /// Redirect checks before the resubmission is judged a failure.
    pub redirect_polls: u32,
    /// Settle wait after a reload, before re-extracting the challenge.
    /// Service-dependent, so a range rather than a constant.
    pub reload_settle_min_ms: u64,
    pub reload_settle_max_ms: u64,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            max_cycles: 3,
            poll_interval_ms: 5000,
            max_polls: 24,
            redirect_poll_ms: 800,
            redirect_polls: 5,
            reload_settle_min_ms: 500,
            reload_settle_max_ms: 4000,
        }
    }
}

struct ChallengeSignatures {
    url_fragments: &'static [&'static str],
    text_fragments: &'static [&'static str],
    title_fragments: &'static [&'static str],
}

static SIGNATURES: Lazy<ChallengeSignatures> = Lazy::new(|| ChallengeSignatures {
    url_fragments: &["/sorry/", "/recaptcha/"],
    text_fragments: &[
        "unusual traffic",
        "automated queries",
        "confirm you're not a robot",
    ],
    title_fragments: &["sorry"],
});

/// Check a snapshot against the known challenge-page signatures.
pub fn is_challenge_page(snapshot: &PageSnapshot) -> bool {
    let url = snapshot.url.to_lowercase();
    let title = snapshot.title.to_lowercase();
    let text = snapshot.visible_text.to_lowercase();

    SIGNATURES.url_fragments.iter().any(|s| url.contains(s))
        || SIGNATURES.title_fragments.iter().any(|s| title.contains(s))
        || SIGNATURES.text_fragments.iter().any(|s| text.contains(s))
}

/// Detect-solve-resubmit driver around an external token solver.
pub struct CaptchaResolver {
    solver: Arc<dyn TokenSolver>,
    config: CaptchaConfig,
}

impl CaptchaResolver {
    pub fn new(solver: Arc<dyn TokenSolver>, config: CaptchaConfig) -> Self {
        Self { solver, config }
    }

    pub fn config(&self) -> &CaptchaConfig {
        &self.config
    }

    /// Quick signature check without starting a resolution pass.
    pub async fn check(&self, page: &dyn SearchPage) -> Result<bool, CaptchaError> {
        let snapshot = page.snapshot().await?;
        Ok(is_challenge_page(&snapshot))
    }

    /// Run the full state machine against a challenged page.
    ///
    /// Returns `Clear` when no challenge is present, `Solved` on success,
    /// `Blocked` when there is nothing to solve, and `Unresolved` after
    /// the cycle budget is spent.
    pub async fn resolve(
        &self,
        page: &dyn SearchPage,
        proxy: Option<&ProxyEndpoint>,
        rng: &mut Randomizer,
    ) -> Result<CaptchaVerdict, CaptchaError> {
        let mut state = CaptchaState::Clear;

        for cycle in 1..=self.config.max_cycles {
            if cycle > 1 {
                // Challenge tokens have a short validity window; a widget
                // extracted before the previous solve is already stale.
                // Reload to obtain a fresh challenge before re-extracting.
                debug!("Resolution cycle {}: reloading for a fresh challenge", cycle);
                page.reload().await?;
                let settle = rng.delay_ms(
                    self.config.reload_settle_min_ms,
                    self.config.reload_settle_max_ms,
                );
                timing::pause(settle).await;
            }

            let snapshot = page.snapshot().await?;
            if !is_challenge_page(&snapshot) {
                return Ok(if state == CaptchaState::Clear {
                    CaptchaVerdict::Clear
                } else {
                    CaptchaVerdict::Solved
                });
            }
            state = CaptchaState::Challenged;

            let Some(widget) = page.challenge_widget().await? else {
                // Nothing to solve: this is an IP-level block, not a
                // challenge. Retrying with the same identity is pointless.
                warn!("Challenge page without a solvable widget - egress blocked");
                return Ok(CaptchaVerdict::Blocked);
            };

            state = CaptchaState::Solving;
            let submission = ChallengeSubmission {
                kind: ChallengeKind::RecaptchaV2Enterprise,
                site_key: widget.site_key,
                page_url: snapshot.url.clone(),
                data_s: widget.data_s,
                proxy: proxy.cloned(),
                cookies: page.cookies().await.unwrap_or_default(),
                user_agent: page.user_agent().await.ok(),
            };

            let token = match solve(
                self.solver.as_ref(),
                &submission,
                Duration::from_millis(self.config.poll_interval_ms),
                self.config.max_polls,
            )
            .await
            {
                Ok(token) => token,
                Err(e) => {
                    warn!("Solve attempt {}/{} failed: {}", cycle, self.config.max_cycles, e);
                    continue;
                }
            };

            page.submit_challenge_response(&token.token).await?;
            state = CaptchaState::Resubmitted;

            // The redirect off the challenge page can lag; poll briefly
            // before declaring the resubmission a failure.
            for _ in 0..self.config.redirect_polls {
                timing::pause(Duration::from_millis(self.config.redirect_poll_ms)).await;
                let snap = page.snapshot().await?;
                if !is_challenge_page(&snap) {
                    info!("Challenge cleared after resubmission (cycle {})", cycle);
                    return Ok(CaptchaVerdict::Solved);
                }
            }

            warn!(
                "Still challenged after resubmission (cycle {}/{})",
                cycle, self.config.max_cycles
            );
        }

        Ok(CaptchaVerdict::Unresolved)
    }
}
