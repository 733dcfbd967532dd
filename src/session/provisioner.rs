//! Fingerprint/session provisioning boundary.
//!
//! The provisioning service hands out opaque profile identifiers, boots
//! them into live remote-debugging endpoints, and deletes them on request.
//! Deletion is best-effort: errors are swallowed.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::engine::{PageError, SearchPage};
use crate::proxy::ProxyEndpoint;
use crate::DeviceClass;

/// Provisioning errors (fatal for the attempt; the orchestrator's retry
/// loop handles them).
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Profile request failed: {0}")]
    RequestFailed(String),

    #[error("Profile start failed: {0}")]
    StartFailed(String),

    #[error("Engine attach failed: {0}")]
    AttachFailed(String),
}

/// What the provisioning service needs to mint one identity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionRequest {
    pub device: DeviceClass,
    /// Per-job geographic hint, also used for proxy egress selection.
    pub country_hint: Option<String>,
    #[serde(skip)]
    pub proxy: Option<ProxyEndpoint>,
}

/// An opaque provisioned fingerprint identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintProfile {
    pub id: String,
    pub device: DeviceClass,
}

/// Provisioning service interface.
#[async_trait]
pub trait SessionProvisioner: Send + Sync {
    /// Mint a fresh fingerprint profile bound to the given egress.
    async fn request_profile(
        &self,
        request: &ProvisionRequest,
    ) -> Result<FingerprintProfile, ProvisionError>;

    /// Boot the profile and attach a live page handle.
    async fn start(&self, profile: &FingerprintProfile) -> Result<Box<dyn SearchPage>, ProvisionError>;

    /// Stop and delete the profile. Best-effort; never fails.
    async fn teardown(&self, profile: &FingerprintProfile);
}

/// Connects a remote-debugging endpoint to a live `SearchPage`. Supplied
/// by the embedding browser-automation engine.
#[async_trait]
pub trait PageConnector: Send + Sync {
    async fn connect(&self, debugger_url: &str) -> Result<Box<dyn SearchPage>, PageError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    profile_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartResponse {
    debugger_url: String,
}

/// HTTP client for the provisioning service's request/start/stop protocol.
pub struct HttpProvisioner<C: PageConnector> {
    base_url: String,
    client: reqwest::Client,
    connector: C,
}

impl<C: PageConnector> HttpProvisioner<C> {
    pub fn new(base_url: &str, connector: C) -> Result<Self, ProvisionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ProvisionError::RequestFailed(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            connector,
        })
    }
}

#[async_trait]
impl<C: PageConnector> SessionProvisioner for HttpProvisioner<C> {
    async fn request_profile(
        &self,
        request: &ProvisionRequest,
    ) -> Result<FingerprintProfile, ProvisionError> {
        let mut body = serde_json::json!({
            "deviceClass": request.device,
            "countryHint": request.country_hint,
        });
        if let Some(ref proxy) = request.proxy {
            body["proxy"] = serde_json::json!({
                "url": proxy.url,
                "username": proxy.username,
                "password": proxy.password,
            });
        }

        let response = self
            .client
            .post(format!("{}/profiles", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProvisionError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProvisionError::RequestFailed(format!("HTTP {}", response.status())));
        }

        let profile: ProfileResponse = response
            .json()
            .await
            .map_err(|e| ProvisionError::RequestFailed(e.to_string()))?;

        info!("Provisioned profile {} ({:?})", profile.profile_id, request.device);

        Ok(FingerprintProfile {
            id: profile.profile_id,
            device: request.device,
        })
    }

    async fn start(&self, profile: &FingerprintProfile) -> Result<Box<dyn SearchPage>, ProvisionError> {
        let response = self
            .client
            .post(format!("{}/profiles/{}/start", self.base_url, profile.id))
            .send()
            .await
            .map_err(|e| ProvisionError::StartFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProvisionError::StartFailed(format!("HTTP {}", response.status())));
        }

        let started: StartResponse = response
            .json()
            .await
            .map_err(|e| ProvisionError::StartFailed(e.to_string()))?;

        debug!("Profile {} started at {}", profile.id, started.debugger_url);

        self.connector
            .connect(&started.debugger_url)
            .await
            .map_err(|e| ProvisionError::AttachFailed(e.to_string()))
    }

    async fn teardown(&self, profile: &FingerprintProfile) {
        let result = self
            .client
            .delete(format!("{}/profiles/{}", self.base_url, profile.id))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Profile {} deleted", profile.id);
            }
            Ok(response) => {
                warn!("Profile {} delete returned HTTP {}", profile.id, response.status());
            }
            Err(e) => {
                warn!("Profile {} delete failed: {}", profile.id, e);
            }
        }
    }
}
