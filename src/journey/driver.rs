//! The journey driver.
//!
//! States: Init -> Searching -> Scanning -> {TargetFound -> Dwelling |
//! TargetNotFound} -> Closed, with CaptchaHandling as a re-entrant side
//! transition at every network-dependent checkpoint. The caller owns the
//! session and is responsible for closing it; `Closed` is reached through
//! the session manager's guaranteed teardown on every exit path.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::behavior::{
    click_plan, desktop_scroll_plan, dwell_plan, mobile_scroll_plan, plan_duration, play,
    pointer_path, typing_plan, DwellContext,
};
use crate::captcha::{is_challenge_page, CaptchaResolver, CaptchaVerdict};
use crate::engine::{InputEvent, PageRect, PageSnapshot, SearchPage};
use crate::error::JourneyError;
use crate::scoring::{host_of, score, MATCH_THRESHOLD};
use crate::session::Session;
use crate::timing::{self, Randomizer};
use crate::DeviceClass;

use super::log::ExecutionLog;
use super::profile::JourneyProfile;
use super::result::{JourneyOutcome, JourneyRequest};

/// Driver phase, recorded into the execution log as it advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Init,
    Searching,
    Scanning,
    CaptchaHandling,
    TargetFound,
    Dwelling,
    TargetNotFound,
    Closed,
}

/// Driver tunables.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverConfig {
    /// Wait for result pages to settle after a navigation.
    pub settle_min_ms: u64,
    pub settle_max_ms: u64,
    /// Navigation wait budget in seconds.
    pub nav_timeout_secs: u64,
    /// Dwell budget in seconds when the job gives no hint.
    pub default_dwell_min_secs: u64,
    pub default_dwell_max_secs: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            settle_min_ms: 1500,
            settle_max_ms: 4000,
            nav_timeout_secs: 20,
            default_dwell_min_secs: 20,
            default_dwell_max_secs: 60,
        }
    }
}

/// Drives one journey attempt over an acquired session.
pub struct JourneyDriver {
    resolver: Arc<CaptchaResolver>,
    config: DriverConfig,
}

impl JourneyDriver {
    pub fn new(resolver: Arc<CaptchaResolver>, config: DriverConfig) -> Self {
        Self { resolver, config }
    }

    /// Run the journey. A missing target is a successful negative outcome,
    /// not an error.
    pub async fn run(
        &self,
        session: &Session,
        request: &JourneyRequest,
        profile: &JourneyProfile,
        rng: &mut Randomizer,
        log: &mut ExecutionLog,
    ) -> Result<JourneyOutcome, JourneyError> {
        let page = session.page();
        let mut state = DriverState::Init;
        log.record("journey.init", format!("{:?} \"{}\"", profile.variant, request.keyword));

        // CAPTCHA can greet the session before anything else happens.
        self.checkpoint(session, rng, log, &mut state).await?;

        state = DriverState::Searching;
        let home = page.snapshot().await?;
        let viewport = (home.viewport_width.max(1.0), home.viewport_height.max(1.0));
        let mut pointer = (
            viewport.0 * rng.range_f64(0.3, 0.7),
            viewport.1 * rng.range_f64(0.2, 0.5),
        );

        let search_box = home
            .search_box
            .ok_or_else(|| JourneyError::TransientNavigation("search box not found".into()))?;
        let box_target = point_within(&search_box, rng);

        log.record("search.begin", request.keyword.clone());
        play(page, &pointer_path(pointer, box_target, rng)).await?;
        play(page, &click_plan(box_target, rng)).await?;
        pointer = box_target;

        play(page, &typing_plan(&request.keyword, rng)).await?;

        // Think for a beat, then submit.
        timing::pause(rng.delay_ms(700, 1600)).await;
        page.dispatch(InputEvent::KeyEnter).await?;
        if let Err(e) = page.wait_for_navigation(self.config.nav_timeout_secs).await {
            return Err(JourneyError::TransientNavigation(format!("search submit: {e}")));
        }
        timing::pause(rng.delay_ms(self.config.settle_min_ms, self.config.settle_max_ms)).await;

        // Search submission is a checkpoint.
        self.checkpoint(session, rng, log, &mut state).await?;

        state = DriverState::Scanning;
        for page_index in 0..profile.max_pages {
            let snapshot = page.snapshot().await?;
            log.record(
                "scan.page",
                format!("page {} ({} listings)", page_index + 1, snapshot.listings.len()),
            );

            // Skim the results like a reader before picking anything.
            let skim = match request.device {
                DeviceClass::Desktop => desktop_scroll_plan(rng.range_f64(200.0, 500.0), rng),
                DeviceClass::Mobile => {
                    mobile_scroll_plan(rng.range_f64(200.0, 500.0), viewport, rng)
                }
            };
            play(page, &skim).await?;

            if let Some((rank, region, text)) = self.scan_for_target(profile, &snapshot, request, log) {
                state = DriverState::TargetFound;
                log.record("target.found", format!("rank {rank}: {text}"));

                let click_target = point_within(&region, rng);
                play(page, &pointer_path(pointer, click_target, rng)).await?;
                play(page, &click_plan(click_target, rng)).await?;
                pointer = click_target;

                // Local-pack panels expand in place; a failed navigation
                // wait is not fatal here.
                if let Err(e) = page.wait_for_navigation(self.config.nav_timeout_secs).await {
                    debug!("No navigation after target click: {}", e);
                }
                timing::pause(rng.delay_ms(self.config.settle_min_ms, self.config.settle_max_ms))
                    .await;

                self.checkpoint(session, rng, log, &mut state).await?;

                state = DriverState::Dwelling;
                debug!("Session {} entering {:?}", session.id, state);
                let dwell_ms = self.dwell(session, request, rng, log).await?;

                if profile.follow_internal_links {
                    self.follow_internal_link(session, request, &mut pointer, rng, log).await;
                }

                state = DriverState::Closed;
                debug!("Journey finished in state {:?}", state);
                return Ok(JourneyOutcome { found: true, clicked_rank: rank, dwell_ms });
            }

            // Not on this page; paginate if the profile allows it.
            if page_index + 1 < profile.max_pages {
                let Some(next) = snapshot.next_page else {
                    debug!("No next-page control; ending scan early");
                    break;
                };
                let next_target = point_within(&next, rng);
                log.record("scan.paginate", format!("to page {}", page_index + 2));
                play(page, &pointer_path(pointer, next_target, rng)).await?;
                play(page, &click_plan(next_target, rng)).await?;
                pointer = next_target;

                if let Err(e) = page.wait_for_navigation(self.config.nav_timeout_secs).await {
                    return Err(JourneyError::TransientNavigation(format!("pagination: {e}")));
                }
                timing::pause(rng.delay_ms(self.config.settle_min_ms, self.config.settle_max_ms))
                    .await;

                // Pagination is a checkpoint too.
                self.checkpoint(session, rng, log, &mut state).await?;
            }
        }

        state = DriverState::TargetNotFound;
        log.record("target.not_found", request.target.business.clone());
        info!(
            "Session {} target not found for \"{}\"",
            session.id, request.keyword
        );
        debug!("Journey finished in state {:?}", state);
        Ok(JourneyOutcome::not_found())
    }

    /// Try each scan strategy in order; a failing strategy is absorbed and
    /// the scan falls through to the next one.
    fn scan_for_target(
        &self,
        profile: &JourneyProfile,
        snapshot: &PageSnapshot,
        request: &JourneyRequest,
        log: &mut ExecutionLog,
    ) -> Option<(u32, PageRect, String)> {
        for strategy in profile.strategies() {
            let candidates = match strategy.scan(snapshot) {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!("Strategy {} failed: {} - falling through", strategy.name(), e);
                    log.record("scan.strategy_failed", format!("{}: {}", strategy.name(), e));
                    continue;
                }
            };

            for candidate in &candidates {
                if score(&candidate.text, &candidate.link, &request.target) >= MATCH_THRESHOLD {
                    let index = candidate.position.saturating_sub(1) as usize;
                    let region = snapshot.listings.get(index)?.region;
                    log.record(
                        "scan.match",
                        format!("{} via {}", candidate.link, strategy.name()),
                    );
                    return Some((candidate.position, region, candidate.text.clone()));
                }
            }
        }
        None
    }

    /// Simulate reading the landed page for the allotted dwell time.
    async fn dwell(
        &self,
        session: &Session,
        request: &JourneyRequest,
        rng: &mut Randomizer,
        log: &mut ExecutionLog,
    ) -> Result<u64, JourneyError> {
        let page = session.page();
        let snapshot = page.snapshot().await?;

        let budget_secs = request.dwell_secs.unwrap_or_else(|| {
            rng.range_u64(
                self.config.default_dwell_min_secs,
                self.config.default_dwell_max_secs + 1,
            )
        });
        let budget = Duration::from_secs(budget_secs);

        let ctx = DwellContext {
            device: request.device,
            viewport: (
                snapshot.viewport_width.max(1.0),
                snapshot.viewport_height.max(1.0),
            ),
            page_height: snapshot.page_height,
        };

        let plan = dwell_plan(budget, &ctx, rng);
        let planned = plan_duration(&plan);
        log.record("dwell.begin", format!("{}s planned", planned.as_secs()));
        play(page, &plan).await?;
        log.record("dwell.end", "");

        Ok(planned.as_millis() as u64)
    }

    /// Tiered journeys: click one internal link of the landed site and
    /// read a little more. Failures here never fail the journey.
    async fn follow_internal_link(
        &self,
        session: &Session,
        request: &JourneyRequest,
        pointer: &mut (f64, f64),
        rng: &mut Randomizer,
        log: &mut ExecutionLog,
    ) {
        let page = session.page();
        let snapshot = match page.snapshot().await {
            Ok(s) => s,
            Err(e) => {
                debug!("Link-chain snapshot failed: {}", e);
                return;
            }
        };

        let current_host = host_of(&snapshot.url);
        let internal: Vec<_> = snapshot
            .listings
            .iter()
            .filter(|l| !l.href.is_empty() && host_of(&l.href) == current_host)
            .collect();
        if internal.is_empty() {
            debug!("No internal links to follow on {}", snapshot.url);
            return;
        }
        let listing = internal[rng.range_usize(0, internal.len())];

        log.record("chain.follow", listing.href.clone());
        let target = point_within(&listing.region, rng);
        let mut steps = pointer_path(*pointer, target, rng);
        steps.extend(click_plan(target, rng));
        *pointer = target;

        if let Err(e) = play(page, &steps).await {
            debug!("Link-chain click failed: {}", e);
            return;
        }
        if let Err(e) = page.wait_for_navigation(self.config.nav_timeout_secs).await {
            debug!("Link-chain navigation failed: {}", e);
        }

        // A shorter second read.
        let scroll = match request.device {
            DeviceClass::Desktop => desktop_scroll_plan(rng.range_f64(300.0, 800.0), rng),
            DeviceClass::Mobile => mobile_scroll_plan(
                rng.range_f64(300.0, 800.0),
                (snapshot.viewport_width.max(1.0), snapshot.viewport_height.max(1.0)),
                rng,
            ),
        };
        if let Err(e) = play(page, &scroll).await {
            debug!("Link-chain scroll failed: {}", e);
        }
    }

    /// Detect and resolve a challenge at a checkpoint. `Blocked` and an
    /// unresolved challenge escalate to the orchestrator's identity-retry
    /// loop.
    async fn checkpoint(
        &self,
        session: &Session,
        rng: &mut Randomizer,
        log: &mut ExecutionLog,
        state: &mut DriverState,
    ) -> Result<(), JourneyError> {
        let page = session.page();
        let snapshot = page.snapshot().await?;
        if !is_challenge_page(&snapshot) {
            return Ok(());
        }

        let previous = *state;
        *state = DriverState::CaptchaHandling;
        warn!("Session {} challenged at {}", session.id, snapshot.url);
        log.record("captcha.detected", snapshot.url.clone());

        let verdict = self
            .resolver
            .resolve(page, session.proxy.as_ref(), rng)
            .await?;

        match verdict {
            CaptchaVerdict::Clear | CaptchaVerdict::Solved => {
                log.record("captcha.resolved", format!("{verdict:?}"));
                *state = previous;
                Ok(())
            }
            CaptchaVerdict::Blocked => {
                log.record("captcha.blocked", snapshot.url);
                Err(JourneyError::IpBlocked("challenge page with no solvable widget".into()))
            }
            CaptchaVerdict::Unresolved => {
                log.record("captcha.unresolved", snapshot.url);
                Err(JourneyError::CaptchaChallenge(
                    "challenge unresolved after cycle budget".into(),
                ))
            }
        }
    }
}

/// A naturally offset point inside a region (humans don't click centers).
fn point_within(rect: &PageRect, rng: &mut Randomizer) -> (f64, f64) {
    (
        rect.x + rect.width * rng.range_f64(0.3, 0.7),
        rect.y + rect.height * rng.range_f64(0.3, 0.7),
    )
}
