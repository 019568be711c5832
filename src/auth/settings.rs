//! Provider settings document
//!
//! The Instant On portal publishes its SSO topology (base URL, endpoint
//! paths, client identifiers) as an unauthenticated JSON document. Every
//! later authentication stage needs it, and it does not change while the
//! process runs, so [`SettingsResolver`] fetches it once and keeps it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::auth::body_text;
use crate::error::{ExporterError, Result};

/// SSO endpoint topology as published by the portal.
///
/// Only the four fields used by the authorization code flow are required;
/// the rest are kept for diagnostics and default to empty strings.
///
/// # Examples
///
/// ```
/// use instanton_exporter::auth::settings::ProviderSettings;
///
/// let json = r#"{
///     "ssoBaseUrl": "https://sso.example.com",
///     "ssoEndpointAuthZ": "/oauth2/default/v1/authorize",
///     "ssoEndpointTokens": "/oauth2/default/v1/token",
///     "ssoClientIdAuthZ": "portal-client"
/// }"#;
///
/// let settings: ProviderSettings = serde_json::from_str(json).unwrap();
/// assert_eq!(
///     settings.authorization_url(),
///     "https://sso.example.com/oauth2/default/v1/authorize"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Base URL of the SSO provider.
    #[serde(rename = "ssoBaseUrl")]
    pub sso_base_url: String,

    /// Path of the authorization endpoint, relative to the base URL.
    #[serde(rename = "ssoEndpointAuthZ")]
    pub sso_endpoint_authz: String,

    /// Path of the token endpoint, relative to the base URL.
    #[serde(rename = "ssoEndpointTokens")]
    pub sso_endpoint_tokens: String,

    /// OAuth client identifier for the authorization code grant.
    #[serde(rename = "ssoClientIdAuthZ")]
    pub sso_client_id_authz: String,

    /// OAuth client identifier of the credential validation step.
    #[serde(rename = "ssoClientIdAuthN", default)]
    pub sso_client_id_authn: String,

    /// Path of the provider's own authentication endpoint.
    #[serde(rename = "ssoEndpointAuthN", default)]
    pub sso_endpoint_authn: String,

    /// Portal REST API base URL as advertised by the portal.
    #[serde(rename = "restApiUrl", default)]
    pub rest_api_url: String,

    /// Portal health-check URL.
    #[serde(rename = "healthApiUrl", default)]
    pub health_api_url: String,

    /// Redirect target the portal itself registers.
    #[serde(rename = "ssoRedirectUrl", default)]
    pub sso_redirect_url: String,

    /// Deployment environment name.
    #[serde(rename = "ssoEnv", default)]
    pub sso_env: String,

    /// Host name of the SSO provider.
    #[serde(rename = "ssoFqdn", default)]
    pub sso_fqdn: String,
}

impl ProviderSettings {
    /// Full URL of the authorization endpoint.
    pub fn authorization_url(&self) -> String {
        format!("{}{}", self.sso_base_url, self.sso_endpoint_authz)
    }

    /// Full URL of the token endpoint.
    pub fn token_url(&self) -> String {
        format!("{}{}", self.sso_base_url, self.sso_endpoint_tokens)
    }

    fn check_required(&self) -> Result<()> {
        let required = [
            ("ssoBaseUrl", &self.sso_base_url),
            ("ssoEndpointAuthZ", &self.sso_endpoint_authz),
            ("ssoEndpointTokens", &self.sso_endpoint_tokens),
            ("ssoClientIdAuthZ", &self.sso_client_id_authz),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(
                    ExporterError::Decode(format!("settings field {name} is empty")).into(),
                );
            }
        }
        Ok(())
    }
}

/// Fetches the settings document on first use and caches it.
///
/// A failed fetch caches nothing, so the next [`resolve`](Self::resolve)
/// tries again.
#[derive(Debug)]
pub struct SettingsResolver {
    http: reqwest::Client,
    url: String,
    cached: OnceCell<Arc<ProviderSettings>>,
}

impl SettingsResolver {
    /// Creates a resolver for the document at `url`.
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            cached: OnceCell::new(),
        }
    }

    /// Returns the provider settings, fetching them on the first call.
    ///
    /// # Errors
    ///
    /// - [`ExporterError::Transport`] if the request could not be sent.
    /// - [`ExporterError::Protocol`] if the status is not 200.
    /// - [`ExporterError::Decode`] if the body is not a settings document.
    pub async fn resolve(&self) -> Result<Arc<ProviderSettings>> {
        let settings = self
            .cached
            .get_or_try_init(|| async { self.fetch().await.map(Arc::new) })
            .await?;
        Ok(Arc::clone(settings))
    }

    async fn fetch(&self) -> Result<ProviderSettings> {
        tracing::debug!(url = %self.url, "Fetching SSO provider settings");

        let resp = self.http.get(&self.url).send().await.map_err(|e| {
            ExporterError::Transport(format!("failed to fetch settings: {e}"))
        })?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let body = body_text(resp).await;
            return Err(ExporterError::Protocol {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let bytes = resp.bytes().await.map_err(|e| {
            ExporterError::Transport(format!("failed to read settings body: {e}"))
        })?;
        let settings: ProviderSettings = serde_json::from_slice(&bytes)
            .map_err(|e| ExporterError::Decode(format!("failed to decode settings: {e}")))?;
        settings.check_required()?;

        tracing::debug!(
            sso_base_url = %settings.sso_base_url,
            client_id = %settings.sso_client_id_authz,
            "SSO provider settings loaded"
        );
        Ok(settings)
    }
}
