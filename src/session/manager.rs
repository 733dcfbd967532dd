//! Session acquisition and guaranteed teardown.
//!
//! A `Session` is owned by exactly one journey attempt. Its identity
//! (fingerprint profile + proxy egress) is released exactly once, through
//! the manager's registry: either by `Session::close` or - when an attempt
//! is abandoned mid-flight by a timeout - by `force_teardown`.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::{Cookie, SearchPage};
use crate::error::JourneyError;
use crate::proxy::{ProxyEndpoint, ProxyManager};
use crate::DeviceClass;

use super::provisioner::{FingerprintProfile, ProvisionRequest, SessionProvisioner};

/// Session acquisition settings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Search engine home the session opens on.
    pub search_home: String,
    /// Cookies pre-set before first navigation, so the session looks like
    /// a returning visitor instead of a fresh automation profile.
    pub warmup_cookies: Vec<Cookie>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            search_home: "https://www.google.com/".to_string(),
            warmup_cookies: vec![Cookie {
                name: "CONSENT".to_string(),
                value: "YES+cb".to_string(),
                domain: ".google.com".to_string(),
            }],
        }
    }
}

/// Enough state to release an identity after its owning attempt is gone.
struct TeardownGuard {
    profile: FingerprintProfile,
    provisioner: Arc<dyn SessionProvisioner>,
}

/// One acquired browsing identity with a live page.
pub struct Session {
    pub id: String,
    pub profile: FingerprintProfile,
    pub proxy: Option<ProxyEndpoint>,
    pub created_at: Instant,
    page: Box<dyn SearchPage>,
    registry: Arc<DashMap<String, TeardownGuard>>,
    closed: bool,
}

impl Session {
    /// The live page handle.
    pub fn page(&self) -> &dyn SearchPage {
        self.page.as_ref()
    }

    /// Close the session: stop the page and release the identity.
    /// Idempotent; the identity teardown runs at most once.
    pub async fn close(mut self) {
        self.closed = true;
        self.page.close().await;

        if let Some((_, guard)) = self.registry.remove(&self.id) {
            guard.provisioner.teardown(&guard.profile).await;
            info!("Session {} closed (profile {})", self.id, self.profile.id);
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("profile", &self.profile)
            .field("proxy", &self.proxy)
            .field("created_at", &self.created_at)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed {
            // Abandoned mid-attempt (e.g. job deadline). The identity is
            // still registered; the manager releases it asynchronously.
            warn!(
                "Session {} dropped without close; teardown deferred to manager",
                self.id
            );
        }
    }
}

/// Acquires sessions and guarantees identity release.
pub struct SessionManager {
    provisioner: Arc<dyn SessionProvisioner>,
    proxies: Arc<ProxyManager>,
    config: SessionConfig,
    live: Arc<DashMap<String, TeardownGuard>>,
}

impl SessionManager {
    pub fn new(
        provisioner: Arc<dyn SessionProvisioner>,
        proxies: Arc<ProxyManager>,
        config: SessionConfig,
    ) -> Self {
        Self {
            provisioner,
            proxies,
            config,
            live: Arc::new(DashMap::new()),
        }
    }

    /// Number of sessions currently holding an identity.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Acquire a fresh identity: new proxy egress, new fingerprint
    /// profile, live page navigated to the search engine home.
    pub async fn acquire(
        &self,
        device: DeviceClass,
        country_hint: Option<&str>,
    ) -> Result<Session, JourneyError> {
        let proxy = self.proxies.next_endpoint(country_hint);
        if proxy.is_none() && self.proxies.is_enabled() {
            warn!("Proxy manager enabled but returned no endpoint - using direct connection");
        }

        let request = ProvisionRequest {
            device,
            country_hint: country_hint.map(|c| c.to_string()),
            proxy: proxy.clone(),
        };

        let profile = self
            .provisioner
            .request_profile(&request)
            .await
            .map_err(|e| JourneyError::Provisioning(e.to_string()))?;

        let page = match self.provisioner.start(&profile).await {
            Ok(page) => page,
            Err(e) => {
                // The profile exists but never came up; release it now.
                self.provisioner.teardown(&profile).await;
                return Err(JourneyError::Provisioning(e.to_string()));
            }
        };

        let session_id = format!("session-{}", &Uuid::new_v4().to_string()[..8]);

        if !self.config.warmup_cookies.is_empty() {
            if let Err(e) = page.set_cookies(&self.config.warmup_cookies).await {
                warn!("Session {} cookie warmup failed: {}", session_id, e);
            }
        }

        if let Err(e) = page.navigate(&self.config.search_home).await {
            page.close().await;
            self.provisioner.teardown(&profile).await;
            return Err(JourneyError::Provisioning(format!(
                "initial navigation failed: {e}"
            )));
        }

        self.live.insert(
            session_id.clone(),
            TeardownGuard {
                profile: profile.clone(),
                provisioner: self.provisioner.clone(),
            },
        );

        info!(
            "Session {} acquired (profile {}, egress sessid {:?})",
            session_id,
            profile.id,
            proxy.as_ref().map(|p| p.session_id)
        );

        Ok(Session {
            id: session_id,
            profile,
            proxy,
            created_at: Instant::now(),
            page,
            registry: self.live.clone(),
            closed: false,
        })
    }

    /// Release the identity of an abandoned session asynchronously.
    /// Returns false when the session already released it.
    pub fn force_teardown(&self, session_id: &str) -> bool {
        if let Some((id, guard)) = self.live.remove(session_id) {
            warn!("Force-releasing identity of abandoned session {}", id);
            tokio::spawn(async move {
                guard.provisioner.teardown(&guard.profile).await;
            });
            true
        } else {
            false
        }
    }
}
