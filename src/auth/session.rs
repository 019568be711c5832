//! Authentication state machine
//!
//! [`Authenticator`] owns everything the chain has produced so far and
//! drives the missing stages on demand:
//!
//! ```text
//! Uninitialized -> SettingsReady -> SessionTokenReady -> AccessTokenReady
//!                                          |                  ^
//!                                          +-- (code, PKCE) --+
//! ```
//!
//! The authorization code and its PKCE verifier exist only inside
//! [`Authenticator::token`] between the authorize and exchange stages; they
//! are never stored. A failing stage returns its error and leaves every
//! earlier state in place, so a retry resumes where the last attempt
//! stopped. Once an access token exists the session token is dropped.
//!
//! The one exception is an expired session token: a retry that finds one
//! validates the credentials again instead of replaying it.
//!
//! # Thread safety
//!
//! State sits behind a `tokio::sync::Mutex` held for the whole acquisition,
//! so concurrent callers on a cold cache wait for one chain instead of each
//! running their own.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::auth::authorize::{self, AuthorizationRequest};
use crate::auth::mfa::{self, SessionToken};
use crate::auth::pkce;
use crate::auth::settings::{ProviderSettings, SettingsResolver};
use crate::auth::token::{self, AccessToken};
use crate::auth::SsoHttp;
use crate::config::{Config, CredentialsConfig, SsoConfig};
use crate::error::Result;

/// What the chain has produced so far.
#[derive(Debug, Clone)]
pub enum AuthState {
    /// Nothing fetched yet.
    Uninitialized,

    /// Provider settings are known.
    SettingsReady {
        /// Provider topology.
        settings: Arc<ProviderSettings>,
    },

    /// Credentials validated; next step is a fresh PKCE pair and code.
    SessionTokenReady {
        /// Provider topology.
        settings: Arc<ProviderSettings>,
        /// Session token from credential validation.
        session: SessionToken,
    },

    /// A usable bearer token is cached.
    AccessTokenReady {
        /// Provider topology.
        settings: Arc<ProviderSettings>,
        /// Current access token.
        token: AccessToken,
    },
}

impl AuthState {
    /// Short name for logs and assertions.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::SettingsReady { .. } => "SettingsReady",
            Self::SessionTokenReady { .. } => "SessionTokenReady",
            Self::AccessTokenReady { .. } => "AccessTokenReady",
        }
    }
}

/// Produces bearer tokens for one service account.
///
/// # Examples
///
/// ```no_run
/// use instanton_exporter::auth::Authenticator;
/// use instanton_exporter::Config;
///
/// # async fn example() -> instanton_exporter::Result<()> {
/// let mut config = Config::default();
/// config.credentials.username = "ops@example.com".to_string();
/// config.credentials.password = "secret".to_string();
///
/// let auth = Authenticator::new(&config)?;
/// let bearer = auth.token().await?;
/// println!("token has {} characters", bearer.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Authenticator {
    http: SsoHttp,
    sso: SsoConfig,
    credentials: CredentialsConfig,
    settings: SettingsResolver,
    state: Mutex<AuthState>,
}

impl Authenticator {
    /// Creates an authenticator in the `Uninitialized` state. No I/O happens
    /// until the first [`token`](Self::token) call.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP clients cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let http = SsoHttp::new(config.sso.request_timeout())?;
        let settings = SettingsResolver::new(http.general.clone(), config.sso.settings_url.clone());

        Ok(Self {
            http,
            sso: config.sso.clone(),
            credentials: config.credentials.clone(),
            settings,
            state: Mutex::new(AuthState::Uninitialized),
        })
    }

    /// Returns a bearer token, running whichever stages are not cached.
    ///
    /// A warm cache returns without I/O. A cold cache performs up to four
    /// requests: settings, credential validation, authorization, exchange.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure unchanged. State reached before the
    /// failure stays cached.
    pub async fn token(&self) -> Result<String> {
        let mut state = self.state.lock().await;

        // Checked once on entry; a token validated during this call is used
        // even if its lifetime is zero.
        if let AuthState::SessionTokenReady { settings, session } = &*state {
            if session.is_expired() {
                tracing::info!(
                    lifetime_seconds = session.lifetime_seconds,
                    "Session token expired; validating credentials again"
                );
                let settings = Arc::clone(settings);
                *state = AuthState::SettingsReady { settings };
            }
        }

        loop {
            let next = match &*state {
                AuthState::AccessTokenReady { token, .. } if !token.is_empty() => {
                    tracing::debug!("Using cached access token");
                    return Ok(token.value.clone());
                }
                AuthState::AccessTokenReady { settings, .. } => AuthState::SettingsReady {
                    settings: Arc::clone(settings),
                },
                AuthState::Uninitialized => AuthState::SettingsReady {
                    settings: self.settings.resolve().await?,
                },
                AuthState::SettingsReady { settings } => {
                    let settings = Arc::clone(settings);
                    let session = mfa::validate(
                        &self.http.general,
                        &self.sso.mfa_url,
                        &self.credentials.username,
                        &self.credentials.password,
                    )
                    .await?;
                    AuthState::SessionTokenReady { settings, session }
                }
                AuthState::SessionTokenReady { settings, session } => {
                    let settings = Arc::clone(settings);
                    let token = self.authorize_and_exchange(&settings, session).await?;
                    AuthState::AccessTokenReady { settings, token }
                }
            };

            tracing::debug!(from = state.name(), to = next.name(), "Auth state transition");
            *state = next;
        }
    }

    /// Drops a cached access token so the next [`token`](Self::token) call
    /// re-validates credentials and runs a fresh code exchange. Settings stay
    /// cached. Has no effect in any other state.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        if let AuthState::AccessTokenReady { settings, .. } = &*state {
            let settings = Arc::clone(settings);
            tracing::info!("Access token invalidated; next request re-authenticates");
            *state = AuthState::SettingsReady { settings };
        }
    }

    /// Current state name.
    pub async fn state_name(&self) -> &'static str {
        self.state.lock().await.name()
    }

    /// Authorize with a fresh PKCE pair, then exchange the code with that
    /// same pair's verifier.
    async fn authorize_and_exchange(
        &self,
        settings: &ProviderSettings,
        session: &SessionToken,
    ) -> Result<AccessToken> {
        let pkce = pkce::generate()?;

        let request = AuthorizationRequest {
            settings,
            session_token: session,
            pkce: &pkce,
            redirect_uri: &self.sso.redirect_uri,
            scope: &self.sso.scope,
        };
        let code = authorize::obtain_code(&self.http.no_redirect, &request).await?;
        tracing::debug!(state = "AuthCodeReady", "Auth state transition");

        token::exchange(
            &self.http.general,
            settings,
            &code,
            &pkce.verifier,
            &self.sso.redirect_uri,
        )
        .await
    }
}
