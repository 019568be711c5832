//! Shared helpers for integration tests
//!
//! One wiremock server plays every remote party: the settings host, the SSO
//! provider, and the portal API.

#![allow(dead_code)]

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use instanton_exporter::Config;

pub const SETTINGS_PATH: &str = "/settings.json";
pub const MFA_PATH: &str = "/aio/api/v1/mfa/validate/full";
pub const AUTHORIZE_PATH: &str = "/as/authorization.oauth2";
pub const TOKEN_PATH: &str = "/as/token.oauth2";
pub const API_PREFIX: &str = "/api";
pub const CLIENT_ID: &str = "portal-client";
pub const REDIRECT_URI: &str = "https://portal.example";

/// A configuration whose every endpoint points at `server`.
pub fn test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.credentials.username = "ops@example.com".to_string();
    config.credentials.password = "hunter2".to_string();
    config.sso.settings_url = format!("{}{}", server.uri(), SETTINGS_PATH);
    config.sso.mfa_url = format!("{}{}", server.uri(), MFA_PATH);
    config.sso.redirect_uri = REDIRECT_URI.to_string();
    config.sso.request_timeout_seconds = 5;
    config.api.base_url = format!("{}{}", server.uri(), API_PREFIX);
    config.api.request_timeout_seconds = 5;
    config
}

/// Settings document pointing the SSO endpoints back at `server`.
pub fn settings_body(server: &MockServer) -> serde_json::Value {
    serde_json::json!({
        "ssoBaseUrl": server.uri(),
        "ssoEndpointAuthZ": AUTHORIZE_PATH,
        "ssoEndpointTokens": TOKEN_PATH,
        "ssoClientIdAuthZ": CLIENT_ID,
        "ssoClientIdAuthN": "authn-client",
        "restApiUrl": format!("{}{}", server.uri(), API_PREFIX),
        "ssoEnv": "test"
    })
}

pub async fn mount_settings(server: &MockServer, expected: u64) {
    Mock::given(method("GET"))
        .and(path(SETTINGS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(settings_body(server)))
        .expect(expected)
        .mount(server)
        .await;
}

pub async fn mount_mfa(server: &MockServer, session_token: &str, expected: u64) {
    mount_mfa_with_lifetime(server, session_token, 60, expected).await;
}

pub async fn mount_mfa_with_lifetime(
    server: &MockServer,
    session_token: &str,
    expires_in: u64,
    expected: u64,
) {
    Mock::given(method("POST"))
        .and(path(MFA_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": session_token,
            "expires_in": expires_in,
            "success": true
        })))
        .expect(expected)
        .mount(server)
        .await;
}

pub async fn mount_authorize(server: &MockServer, code: &str, expected: u64) {
    Mock::given(method("GET"))
        .and(path(AUTHORIZE_PATH))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{}/?code={}", REDIRECT_URI, code).as_str()),
        )
        .expect(expected)
        .mount(server)
        .await;
}

pub async fn mount_token(server: &MockServer, access_token: &str, expected: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": 1800
        })))
        .expect(expected)
        .mount(server)
        .await;
}

/// Mounts all four SSO stages, each expected `expected` times.
pub async fn mount_sso(server: &MockServer, access_token: &str, expected: u64) {
    mount_settings(server, 1).await;
    mount_mfa(server, "sess_abc", expected).await;
    mount_authorize(server, "code_123", expected).await;
    mount_token(server, access_token, expected).await;
}

/// Mounts a JSON response for `GET /api{endpoint}`.
pub async fn mount_api(server: &MockServer, endpoint: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("{}{}", API_PREFIX, endpoint)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Query parameter `name` of `url`, decoded.
pub fn query_value(url: &url::Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Form field `name` of an `application/x-www-form-urlencoded` body.
pub fn form_value(body: &[u8], name: &str) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}
