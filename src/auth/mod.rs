//! Instant On SSO authentication
//!
//! This module turns a username/password pair into a bearer token for the
//! Instant On API. The provider does not offer a client-credentials grant,
//! so the exporter walks the same chain the web portal does:
//!
//! 1. Fetch the provider topology document ([`settings`]).
//! 2. Validate the credentials to obtain a short-lived session token
//!    ([`mfa`]).
//! 3. Generate a PKCE pair ([`pkce`]) and request an authorization code,
//!    capturing it from the redirect instead of following it ([`authorize`]).
//! 4. Exchange the code and verifier for an access token ([`token`]).
//!
//! [`session::Authenticator`] drives these stages lazily and caches what each
//! one produced.
//!
//! # Module Layout
//!
//! - [`settings`]  -- provider settings document and its resolver
//! - [`pkce`]      -- PKCE `S256` verifier/challenge generation
//! - [`mfa`]       -- credential validation, yields the session token
//! - [`authorize`] -- authorization code capture from the redirect
//! - [`token`]     -- code-for-token exchange
//! - [`session`]   -- stage orchestration and caching

pub mod authorize;
pub mod mfa;
pub mod pkce;
pub mod session;
pub mod settings;
pub mod token;

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{ExporterError, Result};

pub use session::{AuthState, Authenticator};

/// HTTP clients used by the authentication stages.
///
/// Two clients are kept apart so redirect following is disabled only for the
/// authorization request and never for anything else.
#[derive(Debug, Clone)]
pub struct SsoHttp {
    /// General-purpose client with default redirect handling.
    pub general: reqwest::Client,

    /// Client that returns 3xx responses to the caller unfollowed.
    pub no_redirect: reqwest::Client,
}

impl SsoHttp {
    /// Builds both clients with the same per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ExporterError::Config`] if the TLS backend cannot be
    /// initialized.
    pub fn new(timeout: Duration) -> Result<Self> {
        let general = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExporterError::Config(format!("Failed to create HTTP client: {e}")))?;

        let no_redirect = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ExporterError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            general,
            no_redirect,
        })
    }
}

/// Reads a response body for diagnostics, never failing.
pub(crate) async fn body_text(resp: reqwest::Response) -> String {
    resp.text().await.unwrap_or_default()
}

/// `obtained_at` plus a provider-reported lifetime, saturating at the
/// largest representable instant.
pub(crate) fn expiry(obtained_at: DateTime<Utc>, lifetime_seconds: u64) -> DateTime<Utc> {
    i64::try_from(lifetime_seconds)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .and_then(|lifetime| obtained_at.checked_add_signed(lifetime))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
