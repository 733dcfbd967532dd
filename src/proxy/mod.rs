//! Proxy gateway module
//!
//! Rotating authenticated egress for session identities. Each session gets
//! a unique gateway sessid so no two concurrent sessions share an exit IP.

mod config;
mod gateway;

pub use config::ProxyConfig;
pub use gateway::{EgressGenerator, ProxyEndpoint};

use parking_lot::RwLock;
use tracing::info;

/// Centralized egress rotation for all browser sessions.
///
/// Wraps `EgressGenerator` behind a runtime-reconfigurable facade; when
/// disabled, sessions use a direct connection.
pub struct ProxyManager {
    inner: RwLock<ProxyManagerInner>,
}

struct ProxyManagerInner {
    generator: EgressGenerator,
    enabled: bool,
    verified: bool,
}

impl std::fmt::Debug for ProxyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("ProxyManager")
            .field("enabled", &inner.enabled)
            .finish()
    }
}

impl ProxyManager {
    /// Create a new manager with the given configuration
    pub fn new(config: ProxyConfig) -> Self {
        let enabled = config.is_configured();
        let generator = EgressGenerator::new(config);

        info!("ProxyManager initialized (enabled: {})", enabled);

        Self {
            inner: RwLock::new(ProxyManagerInner { generator, enabled, verified: false }),
        }
    }

    /// Create a disabled manager (direct connection)
    pub fn disabled() -> Self {
        let config = ProxyConfig::default();
        Self {
            inner: RwLock::new(ProxyManagerInner {
                generator: EgressGenerator::new(config),
                enabled: false,
                verified: false,
            }),
        }
    }

    /// Reconfigure the gateway at runtime
    pub fn configure(&self, config: ProxyConfig) {
        let enabled = config.is_configured();
        let generator = EgressGenerator::new(config);

        let mut inner = self.inner.write();
        inner.generator = generator;
        inner.enabled = enabled;
        inner.verified = false;

        info!("ProxyManager reconfigured (enabled: {})", enabled);
    }

    /// Disable egress rotation at runtime
    pub fn disable(&self) {
        let mut inner = self.inner.write();
        inner.enabled = false;
        info!("ProxyManager disabled");
    }

    /// Get the next unique egress endpoint, honoring a per-job country hint.
    pub fn next_endpoint(&self, country_override: Option<&str>) -> Option<ProxyEndpoint> {
        let inner = self.inner.read();
        if !inner.enabled {
            return None;
        }
        Some(inner.generator.endpoint(country_override))
    }

    /// Check if egress rotation is enabled
    pub fn is_enabled(&self) -> bool {
        self.inner.read().enabled
    }

    /// Check if the gateway is properly configured
    pub fn is_configured(&self) -> bool {
        self.inner.read().generator.is_configured()
    }

    /// Check if the gateway has been verified (tested successfully)
    pub fn is_verified(&self) -> bool {
        self.inner.read().verified
    }

    /// Set verified status
    pub fn set_verified(&self, verified: bool) {
        self.inner.write().verified = verified;
        info!("Proxy verified status: {}", verified);
    }
}
