//! Authorization code exchange
//!
//! Final stage of the chain: trades the authorization code and the PKCE
//! verifier for the bearer token presented to the Instant On API.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::auth::authorize::AuthorizationCode;
use crate::auth::{body_text, expiry};
use crate::auth::settings::ProviderSettings;
use crate::error::{ExporterError, Result};

/// Bearer credential for the Instant On API.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// Opaque token value, sent as `Authorization: Bearer <value>`.
    pub value: String,

    /// Token type reported by the provider (normally `Bearer`).
    pub token_type: String,

    /// Lifetime reported by the provider, in seconds.
    pub lifetime_seconds: u64,

    /// When the exchange completed.
    pub obtained_at: DateTime<Utc>,
}

impl AccessToken {
    /// An empty token must be reacquired.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Expiry derived from the reported lifetime. Informational only; the
    /// exporter does not refresh on a timer.
    pub fn expires_at(&self) -> DateTime<Utc> {
        expiry(self.obtained_at, self.lifetime_seconds)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("lifetime_seconds", &self.lifetime_seconds)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    expires_in: u64,
}

/// Exchanges an authorization code for an access token.
///
/// `redirect_uri` must be the exact value sent on the authorization request,
/// and `code_verifier` the verifier whose challenge was sent there.
///
/// # Errors
///
/// - [`ExporterError::Transport`] if the request could not be sent.
/// - [`ExporterError::TokenExchange`] if the status is not 200 or the body
///   does not carry a non-empty `access_token`.
pub async fn exchange(
    http: &reqwest::Client,
    settings: &ProviderSettings,
    code: &AuthorizationCode,
    code_verifier: &str,
    redirect_uri: &str,
) -> Result<AccessToken> {
    let params = [
        ("grant_type", "authorization_code"),
        ("client_id", settings.sso_client_id_authz.as_str()),
        ("redirect_uri", redirect_uri),
        ("code", code.as_str()),
        ("code_verifier", code_verifier),
    ];

    tracing::debug!(endpoint = %settings.token_url(), "Exchanging authorization code");

    let resp = http
        .post(settings.token_url())
        .form(&params)
        .send()
        .await
        .map_err(|e| ExporterError::Transport(format!("failed to send token request: {e}")))?;

    let status = resp.status();
    let body = body_text(resp).await;

    if status != reqwest::StatusCode::OK {
        return Err(ExporterError::TokenExchange {
            status: status.as_u16(),
            body,
        }
        .into());
    }

    let parsed: TokenResponse = match serde_json::from_str(&body) {
        Ok(parsed) => parsed,
        Err(_) => {
            return Err(ExporterError::TokenExchange {
                status: status.as_u16(),
                body,
            }
            .into())
        }
    };

    if parsed.access_token.is_empty() {
        return Err(ExporterError::TokenExchange {
            status: status.as_u16(),
            body,
        }
        .into());
    }

    tracing::info!(
        expires_in = parsed.expires_in,
        "Access token obtained (expires in {} seconds)",
        parsed.expires_in
    );

    Ok(AccessToken {
        value: parsed.access_token,
        token_type: parsed.token_type,
        lifetime_seconds: parsed.expires_in,
        obtained_at: Utc::now(),
    })
}
