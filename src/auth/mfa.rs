//! Credential validation
//!
//! The provider's MFA validation endpoint accepts the account credentials as
//! a form post and returns a short-lived session token. The token is shaped
//! like an OAuth access token but only authorizes the next step (the
//! authorization code request); it is never sent to the Instant On API.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::auth::{body_text, expiry};
use crate::error::{ExporterError, Result};

/// Short-lived credential returned by credential validation.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    /// Opaque token value, sent as `sessionToken` on the authorization request.
    pub value: String,

    /// Lifetime reported by the provider, in seconds.
    pub lifetime_seconds: u64,

    /// When validation succeeded.
    pub obtained_at: DateTime<Utc>,
}

impl SessionToken {
    /// A token obtained now with the given lifetime.
    pub fn new(value: impl Into<String>, lifetime_seconds: u64) -> Self {
        Self {
            value: value.into(),
            lifetime_seconds,
            obtained_at: Utc::now(),
        }
    }

    /// Expiry derived from the reported lifetime.
    pub fn expires_at(&self) -> DateTime<Utc> {
        expiry(self.obtained_at, self.lifetime_seconds)
    }

    /// Whether the provider would reject this token by now. A zero lifetime
    /// counts as already expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at()
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("value", &"<redacted>")
            .field("lifetime_seconds", &self.lifetime_seconds)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct MfaResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: u64,
    #[serde(default)]
    success: bool,
}

/// Exchanges username and password for a session token.
///
/// Sends one `application/x-www-form-urlencoded` POST. Succeeds only on HTTP
/// 200 with a JSON body whose `success` flag is true and whose
/// `access_token` is non-empty.
///
/// # Errors
///
/// - [`ExporterError::Transport`] if the request could not be sent.
/// - [`ExporterError::Authentication`] for any rejection, with the status
///   and body in the message where there is one.
pub async fn validate(
    http: &reqwest::Client,
    mfa_url: &str,
    username: &str,
    password: &str,
) -> Result<SessionToken> {
    tracing::debug!(url = %mfa_url, "Validating credentials");

    let resp = http
        .post(mfa_url)
        .form(&[("username", username), ("password", password)])
        .send()
        .await
        .map_err(|e| ExporterError::Transport(format!("failed to send MFA request: {e}")))?;

    let status = resp.status();
    let body = body_text(resp).await;

    if status != reqwest::StatusCode::OK {
        return Err(ExporterError::Authentication(format!(
            "MFA validation failed: status {}, body: {}",
            status.as_u16(),
            body
        ))
        .into());
    }

    let parsed: MfaResponse = serde_json::from_str(&body).map_err(|e| {
        ExporterError::Authentication(format!("failed to decode MFA response: {e}"))
    })?;

    if !parsed.success {
        return Err(
            ExporterError::Authentication("MFA validation was not successful".to_string()).into(),
        );
    }

    if parsed.access_token.is_empty() {
        return Err(ExporterError::Authentication(
            "no access token received from MFA validation".to_string(),
        )
        .into());
    }

    tracing::info!(
        expires_in = parsed.expires_in,
        "Session token obtained (expires in {} seconds)",
        parsed.expires_in
    );

    Ok(SessionToken::new(parsed.access_token, parsed.expires_in))
}
