//! serp-journey
//!
//! Drives automated, human-mimicking search-engine interaction sessions on
//! behalf of queued jobs: acquire a fingerprinted session behind rotating
//! proxy egress, search, find the target among the results, click it and
//! dwell like a reader - resolving bot-detection challenges along the way.
//!
//! The crate is invoked programmatically: hand an `Orchestrator` a job
//! store, a session provisioner and a token solver, and let it poll.
//! Page rendering and DOM traversal stay behind the `engine::SearchPage`
//! boundary.

pub mod behavior;
pub mod captcha;
pub mod engine;
pub mod error;
pub mod journey;
pub mod orchestrator;
pub mod proxy;
pub mod scoring;
pub mod session;
pub mod timing;

use std::path::PathBuf;

pub use error::JourneyError;

/// Device class a job runs as; shapes fingerprinting, scrolling and dwell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
}

/// Aggregate configuration for one runner process.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunnerConfig {
    /// Solving-service API key
    pub captcha_api_key: String,
    pub proxy: proxy::ProxyConfig,
    pub session: session::SessionConfig,
    pub captcha: captcha::CaptchaConfig,
    pub driver: journey::DriverConfig,
    pub orchestrator: orchestrator::OrchestratorConfig,
}

/// Get log directory path (shared across modules)
pub fn log_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("serp-journey").join("logs"))
}

/// Initialize logging: console layer plus a daily-rolling file layer when
/// a log directory is available.
pub fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false);

    if let Some(log_dir) = log_dir() {
        let _ = std::fs::create_dir_all(&log_dir);
        let file_appender = tracing_appender::rolling::daily(&log_dir, "serp-journey.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(non_blocking);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();

        None
    }
}
