//! Job processing: concurrency slots, deadline, identity-retry loop and
//! unconditional persistence.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::JourneyError;
use crate::journey::{ExecutionLog, JourneyDriver, JourneyProfile, JourneyResult};
use crate::session::SessionManager;
use crate::timing::{self, Randomizer};

use super::job::{merge_result, Job, JobParams, JobStatus};
use super::queue::{ExecutionLogSink, JobStore};
use super::stats::{RunStats, RunStatsSnapshot};

/// Orchestrator tunables.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorConfig {
    /// Concurrency slot count. Commonly 1.
    pub max_concurrent_jobs: usize,
    /// Whole-job deadline, internal retries included.
    pub job_timeout_secs: u64,
    /// Identity-retry attempts per job.
    pub max_attempts: u32,
    /// Bounded random backoff between attempts.
    pub retry_backoff_min_ms: u64,
    pub retry_backoff_max_ms: u64,
    /// Jobs stuck running longer than this are force-failed at startup.
    pub stale_after_secs: u64,
    /// Poll loop interval.
    pub poll_interval_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 1,
            job_timeout_secs: 300,
            max_attempts: 5,
            retry_backoff_min_ms: 2000,
            retry_backoff_max_ms: 5000,
            stale_after_secs: 600,
            poll_interval_ms: 2000,
        }
    }
}

/// Pulls jobs, runs journeys, persists results. The poll loop survives any
/// single job's failure; nothing propagates past this type.
pub struct Orchestrator {
    store: Arc<dyn JobStore>,
    sink: Arc<dyn ExecutionLogSink>,
    sessions: Arc<SessionManager>,
    driver: Arc<JourneyDriver>,
    config: OrchestratorConfig,
    active: AtomicUsize,
    stats: RunStats,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn JobStore>,
        sink: Arc<dyn ExecutionLogSink>,
        sessions: Arc<SessionManager>,
        driver: Arc<JourneyDriver>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            sink,
            sessions,
            driver,
            config,
            active: AtomicUsize::new(0),
            stats: RunStats::new(),
        }
    }

    /// Jobs currently holding a slot.
    pub fn active_jobs(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> RunStatsSnapshot {
        self.stats.snapshot()
    }

    /// Startup crash-recovery sweep: no job may remain running forever.
    pub async fn recover_stale(&self) -> usize {
        match self
            .store
            .fail_stale(Duration::from_secs(self.config.stale_after_secs))
            .await
        {
            Ok(count) => count,
            Err(e) => {
                warn!("Stale-job sweep failed: {}", e);
                0
            }
        }
    }

    /// One poll cycle: fetch as many due jobs as there are free slots and
    /// spawn them. Returns how many were spawned.
    pub async fn poll_once(self: Arc<Self>) -> usize {
        let active = self.active.load(Ordering::Relaxed);
        let capacity = self.config.max_concurrent_jobs.saturating_sub(active);
        if capacity == 0 {
            return 0;
        }

        let jobs = match self.store.fetch_pending(capacity).await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!("Pending-job fetch failed: {}", e);
                return 0;
            }
        };

        let count = jobs.len();
        for job in jobs {
            Arc::clone(&self).spawn_job_task_safe(job);
        }
        count
    }

    /// Poll until `is_running` clears.
    pub async fn run(self: Arc<Self>, is_running: Arc<std::sync::atomic::AtomicBool>) {
        info!("Orchestrator poll loop started ({} slots)", self.config.max_concurrent_jobs);
        self.recover_stale().await;

        while is_running.load(Ordering::Relaxed) {
            let spawned = Arc::clone(&self).poll_once().await;
            if spawned > 0 {
                debug!("Spawned {} job tasks", spawned);
            }
            timing::pause(Duration::from_millis(self.config.poll_interval_ms)).await;
        }

        info!("Orchestrator poll loop stopped");
    }

    /// Spawn a job task with panic safety: a panicking job releases its
    /// slot, gets a failure row, and never takes the poll loop down.
    pub fn spawn_job_task_safe(self: Arc<Self>, job: Job) -> tokio::task::JoinHandle<()> {
        self.active.fetch_add(1, Ordering::Relaxed);
        let orchestrator = self;

        tokio::spawn(async move {
            let job_id = job.id.clone();
            let result = std::panic::AssertUnwindSafe(orchestrator.process_job(job))
                .catch_unwind()
                .await;

            if let Err(panic_info) = result {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };

                error!("Job {} task panicked: {}. Recording failure.", job_id, panic_msg);

                if let Err(e) = orchestrator
                    .store
                    .persist_result(
                        &job_id,
                        JobStatus::Failed,
                        serde_json::json!({ "error": panic_msg }),
                        Some(panic_msg.clone()),
                    )
                    .await
                {
                    error!("Failed to record panic result for job {}: {}", job_id, e);
                }
                orchestrator.stats.record_failed();
            }

            orchestrator.active.fetch_sub(1, Ordering::Relaxed);
        })
    }

    /// Process one job: exactly one pending->running transition, then one
    /// running->{completed,failed} transition - even when execution fails.
    /// The save step is isolated from the execution path.
    pub async fn process_job(&self, job: Job) {
        info!("Processing job {} (priority {})", job.id, job.priority);

        if let Err(e) = self.store.mark_running(&job.id).await {
            warn!("Job {} running transition failed: {}", job.id, e);
        }

        let started = Instant::now();

        let result = match JobParams::from_value(&job.params) {
            Ok(params) => {
                // The current session id, shared with the timeout path so
                // an abandoned attempt's identity still gets released.
                let current_session: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
                let deadline = Duration::from_secs(self.config.job_timeout_secs);

                match tokio::time::timeout(
                    deadline,
                    self.run_attempts(&job, &params, current_session.clone()),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => {
                        // The in-flight execution is abandoned, not killed;
                        // its teardown runs asynchronously while the
                        // timeout failure is recorded immediately.
                        if let Some(session_id) = current_session.lock().take() {
                            self.sessions.force_teardown(&session_id);
                        }
                        self.stats.record_timeout();

                        let err = JourneyError::Timeout(format!(
                            "job deadline of {}s exceeded",
                            self.config.job_timeout_secs
                        ));
                        warn!("Job {} timed out: {}", job.id, err);
                        JourneyResult::from_error(
                            &err,
                            started.elapsed().as_millis() as u64,
                            0,
                            &ExecutionLog::new(),
                        )
                    }
                }
            }
            Err(e) => {
                warn!("Job {} has invalid parameters: {}", job.id, e);
                JourneyResult {
                    success: false,
                    found: false,
                    clicked_rank: 0,
                    duration_ms: started.elapsed().as_millis() as u64,
                    error: Some(format!("invalid job parameters: {e}")),
                    captcha_flagged: false,
                    attempts: 0,
                    log: Vec::new(),
                }
            }
        };

        self.save(&job, result).await;
    }

    /// The identity-retry loop. Each attempt gets a brand-new session -
    /// a CAPTCHA failure burns the whole identity, not just the page.
    /// Exits early on the first attempt without a CAPTCHA flag.
    async fn run_attempts(
        &self,
        job: &Job,
        params: &JobParams,
        current_session: Arc<Mutex<Option<String>>>,
    ) -> JourneyResult {
        let started = Instant::now();
        let request = params.to_request();
        let profile = JourneyProfile::for_variant(params.journey);

        let mut last_error: Option<JourneyError> = None;
        let mut last_log = ExecutionLog::new();
        let mut attempts = 0;

        for attempt in 1..=self.config.max_attempts {
            attempts = attempt;
            let mut rng = Randomizer::from_entropy();
            let mut log = ExecutionLog::new();

            let session = match self
                .sessions
                .acquire(params.device, params.country_hint.as_deref())
                .await
            {
                Ok(session) => session,
                Err(e) => {
                    warn!(
                        "Job {} attempt {}/{} provisioning failed: {}",
                        job.id, attempt, self.config.max_attempts, e
                    );
                    last_error = Some(e);
                    last_log = log;
                    if attempt < self.config.max_attempts {
                        let backoff = rng.delay_ms(
                            self.config.retry_backoff_min_ms,
                            self.config.retry_backoff_max_ms,
                        );
                        timing::pause(backoff).await;
                    }
                    continue;
                }
            };

            *current_session.lock() = Some(session.id.clone());
            log.record(
                "attempt.begin",
                format!("attempt {} session {}", attempt, session.id),
            );

            let run = self
                .driver
                .run(&session, &request, &profile, &mut rng, &mut log)
                .await;

            // The old identity is gone before a new one is requested; two
            // live sessions for the same job never coexist.
            current_session.lock().take();
            session.close().await;

            match run {
                Ok(outcome) => {
                    return JourneyResult::from_outcome(
                        &outcome,
                        started.elapsed().as_millis() as u64,
                        attempt,
                        &log,
                    );
                }
                Err(e) if e.is_captcha_flag() && attempt < self.config.max_attempts => {
                    warn!(
                        "Job {} attempt {}/{} CAPTCHA-flagged: {} - rotating identity",
                        job.id, attempt, self.config.max_attempts, e
                    );
                    self.stats.record_captcha_retry();
                    last_error = Some(e);
                    last_log = log;

                    let backoff = rng.delay_ms(
                        self.config.retry_backoff_min_ms,
                        self.config.retry_backoff_max_ms,
                    );
                    timing::pause(backoff).await;
                }
                Err(e) => {
                    warn!("Job {} attempt {} failed: {}", job.id, attempt, e);
                    last_error = Some(e);
                    last_log = log;
                    break;
                }
            }
        }

        let error = last_error
            .unwrap_or_else(|| JourneyError::Provisioning("no attempt executed".into()));
        JourneyResult::from_error(
            &error,
            started.elapsed().as_millis() as u64,
            attempts,
            &last_log,
        )
    }

    /// Persist the merged result and the execution log. Isolated from the
    /// execution path: failures are logged, never thrown back.
    async fn save(&self, job: &Job, result: JourneyResult) {
        let status = if result.success {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        };
        let error = result.error.clone();
        let merged = merge_result(&job.params, &result);

        if let Err(e) = self
            .store
            .persist_result(&job.id, status, merged, error)
            .await
        {
            error!("Persistence failed for job {}: {}", job.id, e);
        }

        if let Err(e) = self.sink.append(&job.id, &result.log).await {
            warn!("Execution log append failed for job {}: {}", job.id, e);
        }

        if result.success {
            self.stats.record_completed(result.found);
            info!(
                "Job {} completed (found: {}, rank: {}, attempts: {})",
                job.id, result.found, result.clicked_rank, result.attempts
            );
        } else {
            self.stats.record_failed();
            info!("Job {} failed: {:?}", job.id, result.error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    use crate::captcha::{CaptchaConfig, CaptchaResolver, CaptchaError, ChallengeSubmission, SolveStatus, TaskId, TokenSolver};
    use crate::engine::{
        ChallengeWidget, Cookie, InputEvent, Listing, ListingKind, PageError, PageRect,
        PageSnapshot, SearchPage,
    };
    use crate::journey::DriverConfig;
    use crate::orchestrator::queue::{MemoryJobStore, MemoryLogSink};
    use crate::proxy::ProxyManager;
    use crate::session::{
        FingerprintProfile, ProvisionError, ProvisionRequest, SessionConfig, SessionProvisioner,
    };

    /// What each successive session's page should do.
    #[derive(Debug, Clone, Copy, PartialEq)]
    enum PageScript {
        /// Challenge page with no solvable widget (IP block).
        Blocked,
        /// Results page containing the target.
        TargetPresent,
        /// Results page without the target.
        TargetAbsent,
        /// Results page missing its search box (transient failure).
        Broken,
        /// Hangs on navigation waits.
        Hang,
    }

    struct ScriptedPage {
        script: PageScript,
    }

    fn results_snapshot(with_target: bool, with_search_box: bool) -> PageSnapshot {
        let mut listings = vec![Listing {
            text: "Pizza enthusiast forum".into(),
            href: "https://forum.example/pizza".into(),
            region: PageRect::new(100.0, 300.0, 500.0, 60.0),
            kind: ListingKind::Organic,
        }];
        if with_target {
            listings.push(Listing {
                text: "Joe's Pizza - Springfield's favorite".into(),
                href: "https://joespizza.com".into(),
                region: PageRect::new(100.0, 400.0, 500.0, 60.0),
                kind: ListingKind::Organic,
            });
        }

        PageSnapshot {
            url: "https://search.example/search?q=pizza".into(),
            title: "pizza - Search".into(),
            visible_text: "About 1,000,000 results".into(),
            search_box: with_search_box.then(|| PageRect::new(300.0, 80.0, 600.0, 40.0)),
            next_page: None,
            listings,
            page_height: 2400.0,
            viewport_width: 1280.0,
            viewport_height: 720.0,
        }
    }

    fn challenge_snapshot() -> PageSnapshot {
        PageSnapshot {
            url: "https://search.example/sorry/index".into(),
            title: "Sorry...".into(),
            visible_text: "unusual traffic from your computer network".into(),
            ..Default::default()
        }
    }

    #[async_trait]
    impl SearchPage for ScriptedPage {
        async fn navigate(&self, _url: &str) -> Result<(), PageError> {
            Ok(())
        }

        async fn reload(&self) -> Result<(), PageError> {
            Ok(())
        }

        async fn current_url(&self) -> Result<String, PageError> {
            Ok("https://search.example/".into())
        }

        async fn wait_for_navigation(&self, _timeout_secs: u64) -> Result<(), PageError> {
            if self.script == PageScript::Hang {
                tokio::time::sleep(Duration::from_secs(1_000_000)).await;
            }
            Ok(())
        }

        async fn snapshot(&self) -> Result<PageSnapshot, PageError> {
            Ok(match self.script {
                PageScript::Blocked => challenge_snapshot(),
                PageScript::TargetPresent => results_snapshot(true, true),
                PageScript::TargetAbsent => results_snapshot(false, true),
                PageScript::Broken => results_snapshot(false, false),
                PageScript::Hang => results_snapshot(true, true),
            })
        }

        async fn dispatch(&self, _input: InputEvent) -> Result<(), PageError> {
            Ok(())
        }

        async fn challenge_widget(&self) -> Result<Option<ChallengeWidget>, PageError> {
            Ok(None)
        }

        async fn submit_challenge_response(&self, _token: &str) -> Result<(), PageError> {
            Ok(())
        }

        async fn cookies(&self) -> Result<Vec<Cookie>, PageError> {
            Ok(vec![])
        }

        async fn set_cookies(&self, _cookies: &[Cookie]) -> Result<(), PageError> {
            Ok(())
        }

        async fn user_agent(&self) -> Result<String, PageError> {
            Ok("ua".into())
        }

        async fn close(&self) {}
    }

    /// Hands out one scripted page per session; repeats the last script
    /// when the list runs dry.
    struct ScriptedProvisioner {
        scripts: Mutex<Vec<PageScript>>,
        fallback: PageScript,
        minted: AtomicU32,
        torn_down: Arc<AtomicU32>,
        profile_ids: Mutex<Vec<String>>,
    }

    impl ScriptedProvisioner {
        fn new(scripts: Vec<PageScript>, fallback: PageScript) -> Self {
            Self {
                scripts: Mutex::new(scripts),
                fallback,
                minted: AtomicU32::new(0),
                torn_down: Arc::new(AtomicU32::new(0)),
                profile_ids: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SessionProvisioner for ScriptedProvisioner {
        async fn request_profile(
            &self,
            request: &ProvisionRequest,
        ) -> Result<FingerprintProfile, ProvisionError> {
            let n = self.minted.fetch_add(1, Ordering::Relaxed);
            let id = format!("profile-{n}");
            self.profile_ids.lock().push(id.clone());
            Ok(FingerprintProfile { id, device: request.device })
        }

        async fn start(
            &self,
            _profile: &FingerprintProfile,
        ) -> Result<Box<dyn SearchPage>, ProvisionError> {
            let mut scripts = self.scripts.lock();
            let script = if scripts.is_empty() { self.fallback } else { scripts.remove(0) };
            Ok(Box::new(ScriptedPage { script }))
        }

        async fn teardown(&self, _profile: &FingerprintProfile) {
            self.torn_down.fetch_add(1, Ordering::Relaxed);
        }
    }

    struct UnusedSolver;

    #[async_trait]
    impl TokenSolver for UnusedSolver {
        async fn submit(&self, _challenge: &ChallengeSubmission) -> Result<TaskId, CaptchaError> {
            panic!("solver must not be invoked in these scenarios");
        }

        async fn poll(&self, _task: TaskId) -> Result<SolveStatus, CaptchaError> {
            panic!("solver must not be invoked in these scenarios");
        }
    }

    fn fast_captcha_config() -> CaptchaConfig {
        CaptchaConfig {
            max_cycles: 2,
            poll_interval_ms: 1,
            max_polls: 1,
            redirect_poll_ms: 1,
            redirect_polls: 1,
            reload_settle_min_ms: 1,
            reload_settle_max_ms: 2,
        }
    }

    fn fast_driver_config() -> DriverConfig {
        DriverConfig {
            settle_min_ms: 1,
            settle_max_ms: 2,
            nav_timeout_secs: 1,
            default_dwell_min_secs: 1,
            default_dwell_max_secs: 2,
        }
    }

    fn fast_orchestrator_config() -> OrchestratorConfig {
        OrchestratorConfig {
            max_concurrent_jobs: 1,
            job_timeout_secs: 3600,
            max_attempts: 5,
            retry_backoff_min_ms: 1,
            retry_backoff_max_ms: 2,
            stale_after_secs: 600,
            poll_interval_ms: 10,
        }
    }

    struct Harness {
        orchestrator: Arc<Orchestrator>,
        store: Arc<MemoryJobStore>,
        sink: Arc<MemoryLogSink>,
        torn_down: Arc<AtomicU32>,
    }

    fn harness(
        provisioner: ScriptedProvisioner,
        orchestrator_config: OrchestratorConfig,
    ) -> Harness {
        let torn_down = provisioner.torn_down.clone();
        let store = Arc::new(MemoryJobStore::new());
        let sink = Arc::new(MemoryLogSink::new());

        let sessions = Arc::new(SessionManager::new(
            Arc::new(provisioner),
            Arc::new(ProxyManager::disabled()),
            SessionConfig::default(),
        ));
        let resolver = Arc::new(CaptchaResolver::new(Arc::new(UnusedSolver), fast_captcha_config()));
        let driver = Arc::new(JourneyDriver::new(resolver, fast_driver_config()));

        let orchestrator = Arc::new(Orchestrator::new(
            store.clone(),
            sink.clone(),
            sessions,
            driver,
            orchestrator_config,
        ));

        Harness { orchestrator, store, sink, torn_down }
    }

    fn pizza_job(id: &str, priority: i32) -> Job {
        Job::pending(
            id,
            serde_json::json!({
                "keyword": "joe's pizza springfield",
                "targetBusiness": "Joe's Pizza",
                "targetDomain": "joespizza.com",
                "dwellSecs": 1
            }),
            priority,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_process_job_completes_and_persists() {
        let h = harness(
            ScriptedProvisioner::new(vec![], PageScript::TargetPresent),
            fast_orchestrator_config(),
        );
        let job = pizza_job("job-1", 0);
        h.store.insert(job.clone());

        h.orchestrator.process_job(job).await;

        let row = h.store.get("job-1").unwrap();
        assert_eq!(row.status, JobStatus::Completed);
        let result = row.last_result.unwrap();
        assert_eq!(result["found"], serde_json::json!(true));
        assert_eq!(result["clickedRank"], serde_json::json!(2));
        // Original identity fields survive the merge.
        assert_eq!(result["targetDomain"], serde_json::json!("joespizza.com"));
        // The execution log was sunk.
        assert_eq!(h.sink.entries_for("job-1").len(), 1);
        // Exactly one session was acquired and torn down.
        assert_eq!(h.torn_down.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_target_not_found_is_success() {
        let h = harness(
            ScriptedProvisioner::new(vec![], PageScript::TargetAbsent),
            fast_orchestrator_config(),
        );
        let job = pizza_job("job-nf", 0);
        h.store.insert(job.clone());

        h.orchestrator.process_job(job).await;

        let row = h.store.get("job-nf").unwrap();
        assert_eq!(row.status, JobStatus::Completed);
        let result = row.last_result.unwrap();
        assert_eq!(result["found"], serde_json::json!(false));
        assert_eq!(result["clickedRank"], serde_json::json!(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_captcha_retries_rotate_identity_then_succeed() {
        let h = harness(
            ScriptedProvisioner::new(
                vec![PageScript::Blocked, PageScript::Blocked],
                PageScript::TargetPresent,
            ),
            fast_orchestrator_config(),
        );
        let job = pizza_job("job-retry", 0);
        h.store.insert(job.clone());

        h.orchestrator.process_job(job).await;

        let row = h.store.get("job-retry").unwrap();
        assert_eq!(row.status, JobStatus::Completed);
        let result = row.last_result.unwrap();
        assert_eq!(result["attempts"], serde_json::json!(3));
        // Every attempt used a distinct identity, and every identity was
        // released.
        assert_eq!(h.torn_down.load(Ordering::Relaxed), 3);
        assert_eq!(h.orchestrator.stats().captcha_retries, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_capped_and_failure_is_captcha_flagged() {
        let h = harness(
            ScriptedProvisioner::new(vec![], PageScript::Blocked),
            fast_orchestrator_config(),
        );
        let job = pizza_job("job-burned", 0);
        h.store.insert(job.clone());

        h.orchestrator.process_job(job).await;

        let row = h.store.get("job-burned").unwrap();
        assert_eq!(row.status, JobStatus::Failed);
        let result = row.last_result.unwrap();
        assert_eq!(result["attempts"], serde_json::json!(5));
        assert_eq!(result["captchaFlagged"], serde_json::json!(true));
        assert_eq!(h.torn_down.load(Ordering::Relaxed), 5);
        assert!(row.error.unwrap().contains("blocked"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_does_not_retry() {
        let h = harness(
            ScriptedProvisioner::new(vec![], PageScript::Broken),
            fast_orchestrator_config(),
        );
        let job = pizza_job("job-broken", 0);
        h.store.insert(job.clone());

        h.orchestrator.process_job(job).await;

        let row = h.store.get("job-broken").unwrap();
        assert_eq!(row.status, JobStatus::Failed);
        let result = row.last_result.unwrap();
        // No CAPTCHA flag: the loop exits after the first attempt.
        assert_eq!(result["attempts"], serde_json::json!(1));
        assert_eq!(result["captchaFlagged"], serde_json::json!(false));
        assert_eq!(h.torn_down.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_force_fails_and_still_releases_session() {
        let mut config = fast_orchestrator_config();
        config.job_timeout_secs = 2;
        let h = harness(ScriptedProvisioner::new(vec![], PageScript::Hang), config);
        let job = pizza_job("job-slow", 0);
        h.store.insert(job.clone());

        h.orchestrator.process_job(job).await;

        // The result row exists immediately, without waiting for teardown.
        let row = h.store.get("job-slow").unwrap();
        assert_eq!(row.status, JobStatus::Failed);
        assert!(row.error.unwrap().contains("deadline"));
        assert_eq!(h.orchestrator.stats().timeouts, 1);

        // The abandoned session's identity is released asynchronously.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(h.torn_down.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_once_takes_highest_priority_within_capacity() {
        let h = harness(
            ScriptedProvisioner::new(vec![], PageScript::TargetPresent),
            fast_orchestrator_config(),
        );
        h.store.insert(pizza_job("job-low", 1));
        h.store.insert(pizza_job("job-high", 5));

        // One slot: only the priority-5 job may start.
        let spawned = h.orchestrator.clone().poll_once().await;
        assert_eq!(spawned, 1);
        assert_eq!(h.orchestrator.active_jobs(), 1);

        // Let the spawned task finish.
        for _ in 0..200 {
            tokio::time::sleep(Duration::from_millis(500)).await;
            if h.orchestrator.active_jobs() == 0 {
                break;
            }
        }
        assert_eq!(h.orchestrator.active_jobs(), 0);

        assert_eq!(h.store.get("job-high").unwrap().status, JobStatus::Completed);
        assert_eq!(h.store.get("job-low").unwrap().status, JobStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provisioning_failure_is_retried() {
        struct FlakyProvisioner {
            failures_left: AtomicU32,
            inner: ScriptedProvisioner,
        }

        #[async_trait]
        impl SessionProvisioner for FlakyProvisioner {
            async fn request_profile(
                &self,
                request: &ProvisionRequest,
            ) -> Result<FingerprintProfile, ProvisionError> {
                if self.failures_left.load(Ordering::Relaxed) > 0 {
                    self.failures_left.fetch_sub(1, Ordering::Relaxed);
                    return Err(ProvisionError::RequestFailed("pool exhausted".into()));
                }
                self.inner.request_profile(request).await
            }

            async fn start(
                &self,
                profile: &FingerprintProfile,
            ) -> Result<Box<dyn SearchPage>, ProvisionError> {
                self.inner.start(profile).await
            }

            async fn teardown(&self, profile: &FingerprintProfile) {
                self.inner.teardown(profile).await;
            }
        }

        let provisioner = FlakyProvisioner {
            failures_left: AtomicU32::new(2),
            inner: ScriptedProvisioner::new(vec![], PageScript::TargetPresent),
        };
        let torn_down = provisioner.inner.torn_down.clone();

        let store = Arc::new(MemoryJobStore::new());
        let sink = Arc::new(MemoryLogSink::new());
        let sessions = Arc::new(SessionManager::new(
            Arc::new(provisioner),
            Arc::new(ProxyManager::disabled()),
            SessionConfig::default(),
        ));
        let resolver = Arc::new(CaptchaResolver::new(Arc::new(UnusedSolver), fast_captcha_config()));
        let driver = Arc::new(JourneyDriver::new(resolver, fast_driver_config()));
        let orchestrator = Arc::new(Orchestrator::new(
            store.clone(),
            sink,
            sessions,
            driver,
            fast_orchestrator_config(),
        ));

        let job = pizza_job("job-flaky", 0);
        store.insert(job.clone());
        orchestrator.process_job(job).await;

        let row = store.get("job-flaky").unwrap();
        assert_eq!(row.status, JobStatus::Completed);
        assert_eq!(row.last_result.unwrap()["attempts"], serde_json::json!(3));
        assert_eq!(torn_down.load(Ordering::Relaxed), 1);
    }
}
