//! Egress endpoint generator
//!
//! Thread-safe proxy endpoint generator with unique session IDs. Each
//! journey attempt gets a fresh sessid so it egresses from a different IP;
//! identities are never shared across concurrent sessions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use urlencoding::encode;

use super::ProxyConfig;

/// Global atomic counter for unique session IDs (thread-safe)
static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One authenticated egress identity, valid for a single session.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyEndpoint {
    /// Full proxy URL including credentials.
    pub url: String,
    pub session_id: u64,
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub scheme: String,
    pub country: String,
}

/// Rotating-egress endpoint generator.
///
/// Each call to `endpoint()` allocates a unique sessid, so every browser
/// session is routed through a different gateway exit.
#[derive(Debug)]
pub struct EgressGenerator {
    config: ProxyConfig,
    /// Base seed for session ID generation
    base_seed: u64,
}

impl EgressGenerator {
    /// Create a new endpoint generator
    pub fn new(config: ProxyConfig) -> Self {
        // Seed from timestamp and process ID so restarts never reuse sessids.
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let pid = std::process::id() as u64;
        let base_seed = (timestamp % 1_000_000) * 1_000_000 + (pid % 1_000_000);

        debug!(
            "EgressGenerator initialized: customer={}, country={}, base_seed={}",
            config.customer, config.country, base_seed
        );

        Self { config, base_seed }
    }

    /// Allocate a unique session ID
    fn allocate_sessid(&self) -> u64 {
        let counter = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.base_seed + counter
    }

    /// Build the gateway username with routing parameters
    fn build_username(&self, sessid: u64, country: &str) -> String {
        format!(
            "customer-{}-cc-{}-sessid-{}-sesstime-{}",
            self.config.customer, country, sessid, self.config.sesstime
        )
    }

    /// Generate the next unique egress endpoint, optionally overriding the
    /// configured country (per-job geographic hint).
    pub fn endpoint(&self, country_override: Option<&str>) -> ProxyEndpoint {
        let sessid = self.allocate_sessid();
        let country = country_override
            .map(|c| c.to_lowercase())
            .unwrap_or_else(|| self.config.country.clone());
        let username = self.build_username(sessid, &country);
        let password_encoded = encode(&self.config.password);

        let url = format!(
            "{}://{}:{}@{}:{}",
            self.config.scheme, username, password_encoded, self.config.host, self.config.port
        );

        debug!("Generated egress endpoint with sessid={}", sessid);

        ProxyEndpoint {
            url,
            session_id: sessid,
            username,
            password: self.config.password.clone(),
            host: self.config.host.clone(),
            port: self.config.port,
            scheme: self.config.scheme.clone(),
            country,
        }
    }

    /// Check if the generator is configured
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }
}
