//! Instant On REST API client
//!
//! Thin wrapper over the portal API: every request asks the
//! [`Authenticator`] for a bearer token and sends the API version header.
//! A `401` drops the cached token so the next call authenticates again.

pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use serde::de::DeserializeOwned;

use crate::auth::Authenticator;
use crate::config::ApiConfig;
use crate::error::{ExporterError, Result};

pub use types::{
    ClientSummaryResponse, Device, InventoryResponse, ListResponse, Site, SitesResponse,
    WiredClient, WiredClientSummaryResponse, WirelessClient,
};

/// Header carrying the API version.
pub const API_VERSION_HEADER: &str = "x-ion-api-version";

/// Authenticated client for the Instant On API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
    auth: Arc<Authenticator>,
}

impl ApiClient {
    /// Creates a client that authenticates through `auth`.
    ///
    /// # Errors
    ///
    /// Returns [`ExporterError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig, auth: Arc<Authenticator>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| ExporterError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            auth,
        })
    }

    /// The authenticator backing this client.
    pub fn authenticator(&self) -> &Arc<Authenticator> {
        &self.auth
    }

    /// Lists the sites visible to the account.
    pub async fn sites(&self) -> Result<SitesResponse> {
        self.get_json("/sites/").await.context("failed to get sites")
    }

    /// Lists the devices of a site.
    pub async fn inventory(&self, site_id: &str) -> Result<InventoryResponse> {
        self.get_json(&format!("/sites/{site_id}/inventory"))
            .await
            .context("failed to get inventory")
    }

    /// Lists the wireless clients of a site.
    pub async fn client_summary(&self, site_id: &str) -> Result<ClientSummaryResponse> {
        self.get_json(&format!("/sites/{site_id}/clientSummary"))
            .await
            .context("failed to get client summary")
    }

    /// Lists the wired clients of a site.
    pub async fn wired_client_summary(&self, site_id: &str) -> Result<WiredClientSummaryResponse> {
        self.get_json(&format!("/sites/{site_id}/wiredClientSummary"))
            .await
            .context("failed to get wired client summary")
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let token = self
            .auth
            .token()
            .await
            .context("failed to get access token")?;

        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!(%url, "GET");

        let resp = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(API_VERSION_HEADER, &self.api_version)
            .send()
            .await
            .map_err(|e| ExporterError::Transport(format!("request to {url} failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ExporterError::Transport(format!("failed to read response: {e}")))?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            tracing::warn!(%url, "API rejected the access token");
            self.auth.invalidate().await;
        }

        if status != reqwest::StatusCode::OK {
            return Err(ExporterError::Api {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        Ok(serde_json::from_str(&body).map_err(ExporterError::from)?)
    }
}
