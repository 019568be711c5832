//! Authorization code capture
//!
//! The authorization endpoint answers a valid request with a redirect to the
//! portal whose query string carries the authorization code. A browser would
//! follow it; the exporter instead sends the request through a client with
//! redirect following disabled and reads the code out of the `Location`
//! header.

use url::Url;

use crate::auth::body_text;
use crate::auth::mfa::SessionToken;
use crate::auth::pkce::PkcePair;
use crate::auth::settings::ProviderSettings;
use crate::error::{ExporterError, Result};

/// One-time code delivered through the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode(String);

impl AuthorizationCode {
    /// The raw code value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Parameters of one authorization request.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationRequest<'a> {
    /// Provider topology.
    pub settings: &'a ProviderSettings,
    /// Session token from credential validation.
    pub session_token: &'a SessionToken,
    /// Freshly generated PKCE pair; only the challenge is sent here.
    pub pkce: &'a PkcePair,
    /// Redirect target; the token request must repeat it byte for byte.
    pub redirect_uri: &'a str,
    /// Space-separated scopes.
    pub scope: &'a str,
}

impl AuthorizationRequest<'_> {
    /// Builds the full authorization URL with its query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ExporterError::Decode`] if the settings do not combine into
    /// a valid URL.
    pub fn url(&self) -> Result<Url> {
        let endpoint = self.settings.authorization_url();
        let mut url = Url::parse(&endpoint).map_err(|e| {
            ExporterError::Decode(format!("invalid authorization endpoint URL {endpoint}: {e}"))
        })?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.settings.sso_client_id_authz)
            .append_pair("scope", self.scope)
            .append_pair("redirect_uri", self.redirect_uri)
            .append_pair("code_challenge", &self.pkce.challenge)
            .append_pair("code_challenge_method", self.pkce.method)
            .append_pair("sessionToken", &self.session_token.value);

        Ok(url)
    }
}

/// Requests an authorization code and captures it from the redirect.
///
/// `no_redirect` must be a client built with
/// `reqwest::redirect::Policy::none()`; a following client would chase the
/// redirect to the portal and lose the `Location` header.
///
/// # Errors
///
/// - [`ExporterError::Transport`] if the request could not be sent.
/// - [`ExporterError::MissingRedirect`] if the response has no `Location`.
/// - [`ExporterError::MissingCode`] if the location carries no `code`.
pub async fn obtain_code(
    no_redirect: &reqwest::Client,
    request: &AuthorizationRequest<'_>,
) -> Result<AuthorizationCode> {
    let url = request.url()?;
    tracing::debug!(
        endpoint = %request.settings.authorization_url(),
        "Requesting authorization code"
    );

    let resp = no_redirect.get(url.clone()).send().await.map_err(|e| {
        ExporterError::Transport(format!("failed to get authorization code: {e}"))
    })?;

    let location = resp
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .filter(|v| !v.is_empty());

    let Some(location) = location else {
        let status = resp.status().as_u16();
        let body = body_text(resp).await;
        return Err(ExporterError::MissingRedirect { status, body }.into());
    };

    let code = extract_code(&location, &url)?;
    tracing::info!("Authorization code obtained");
    Ok(code)
}

/// Reads the `code` query parameter from a redirect location.
///
/// A relative location is resolved against `request_url`.
///
/// # Errors
///
/// Returns [`ExporterError::MissingCode`] if the location cannot be parsed or
/// has no non-empty `code` parameter.
pub fn extract_code(location: &str, request_url: &Url) -> Result<AuthorizationCode> {
    let missing = || ExporterError::MissingCode {
        location: location.to_string(),
    };

    let redirect = match Url::parse(location) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            request_url.join(location).map_err(|_| missing())?
        }
        Err(_) => return Err(missing().into()),
    };

    redirect
        .query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
        .map(AuthorizationCode)
        .ok_or_else(|| missing().into())
}
