//! SSO authentication chain integration tests using wiremock
//!
//! Covers the four stages driven by `Authenticator::token` against a mock
//! provider:
//!
//! - Settings fetch failures surface as `Protocol` or `Transport` and are
//!   not cached.
//! - An expired session token is validated again instead of replayed.
//! - Credential rejection leaves the authenticator in `SettingsReady`.
//! - Authorization responses without a redirect or without a code.
//! - A full chain costs exactly four requests, and a warm cache none.
//! - The verifier sent to the token endpoint matches the challenge sent to
//!   the authorization endpoint.

mod common;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use instanton_exporter::auth::pkce;
use instanton_exporter::{Authenticator, ExporterError};

use common::*;

fn exporter_error(err: &anyhow::Error) -> &ExporterError {
    err.downcast_ref::<ExporterError>()
        .expect("error should be an ExporterError")
}

#[tokio::test]
async fn test_full_chain_returns_access_token_in_four_requests() {
    let server = MockServer::start().await;
    mount_sso(&server, "tok_xyz", 1).await;

    let auth = Authenticator::new(&test_config(&server)).unwrap();
    let token = auth.token().await.unwrap();

    assert_eq!(token, "tok_xyz");
    assert_eq!(auth.state_name().await, "AccessTokenReady");
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
    server.verify().await;
}

#[tokio::test]
async fn test_cached_token_makes_no_requests() {
    let server = MockServer::start().await;
    mount_sso(&server, "tok_xyz", 1).await;

    let auth = Authenticator::new(&test_config(&server)).unwrap();
    let first = auth.token().await.unwrap();
    let before = server.received_requests().await.unwrap().len();

    let second = auth.token().await.unwrap();
    let after = server.received_requests().await.unwrap().len();

    assert_eq!(first, second);
    assert_eq!(before, after);
    server.verify().await;
}

#[tokio::test]
async fn test_concurrent_callers_share_one_chain() {
    let server = MockServer::start().await;
    mount_sso(&server, "tok_xyz", 1).await;

    let auth = Authenticator::new(&test_config(&server)).unwrap();
    let (a, b) = tokio::join!(auth.token(), auth.token());

    assert_eq!(a.unwrap(), "tok_xyz");
    assert_eq!(b.unwrap(), "tok_xyz");
    server.verify().await;
}

#[tokio::test]
async fn test_verifier_matches_challenge_and_session_token_is_forwarded() {
    let server = MockServer::start().await;
    mount_sso(&server, "tok_xyz", 1).await;

    let auth = Authenticator::new(&test_config(&server)).unwrap();
    auth.token().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let authorize = requests
        .iter()
        .find(|r| r.url.path() == AUTHORIZE_PATH)
        .expect("authorization request");
    let exchange = requests
        .iter()
        .find(|r| r.url.path() == TOKEN_PATH)
        .expect("token request");

    let challenge = query_value(&authorize.url, "code_challenge").unwrap();
    let verifier = form_value(&exchange.body, "code_verifier").unwrap();
    assert_eq!(pkce::derive_challenge(&verifier), challenge);

    assert_eq!(
        query_value(&authorize.url, "code_challenge_method").as_deref(),
        Some("S256")
    );
    assert_eq!(
        query_value(&authorize.url, "sessionToken").as_deref(),
        Some("sess_abc")
    );
    assert_eq!(
        query_value(&authorize.url, "client_id").as_deref(),
        Some(CLIENT_ID)
    );
    assert_eq!(
        query_value(&authorize.url, "redirect_uri").as_deref(),
        Some(REDIRECT_URI)
    );

    assert_eq!(
        form_value(&exchange.body, "grant_type").as_deref(),
        Some("authorization_code")
    );
    assert_eq!(form_value(&exchange.body, "code").as_deref(), Some("code_123"));
    assert_eq!(
        form_value(&exchange.body, "redirect_uri").as_deref(),
        Some(REDIRECT_URI)
    );
}

#[tokio::test]
async fn test_mfa_request_carries_credentials() {
    let server = MockServer::start().await;
    mount_sso(&server, "tok_xyz", 1).await;

    let auth = Authenticator::new(&test_config(&server)).unwrap();
    auth.token().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let mfa = requests
        .iter()
        .find(|r| r.url.path() == MFA_PATH)
        .expect("MFA request");
    assert_eq!(
        form_value(&mfa.body, "username").as_deref(),
        Some("ops@example.com")
    );
    assert_eq!(form_value(&mfa.body, "password").as_deref(), Some("hunter2"));
}

#[tokio::test]
async fn test_settings_error_is_protocol_and_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SETTINGS_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_settings(&server, 1).await;
    mount_mfa(&server, "sess_abc", 1).await;
    mount_authorize(&server, "code_123", 1).await;
    mount_token(&server, "tok_xyz", 1).await;

    let auth = Authenticator::new(&test_config(&server)).unwrap();

    let err = auth.token().await.unwrap_err();
    match exporter_error(&err) {
        ExporterError::Protocol { status, body } => {
            assert_eq!(*status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected Protocol error, got {other:?}"),
    }
    assert_eq!(auth.state_name().await, "Uninitialized");

    assert_eq!(auth.token().await.unwrap(), "tok_xyz");
    server.verify().await;
}

#[tokio::test]
async fn test_unreachable_settings_host_is_transport_error() {
    let server = MockServer::start().await;
    let mut config = test_config(&server);
    // Nothing listens on port 1
    config.sso.settings_url = "http://127.0.0.1:1/settings.json".to_string();

    let auth = Authenticator::new(&config).unwrap();
    let err = auth.token().await.unwrap_err();

    assert!(matches!(exporter_error(&err), ExporterError::Transport(_)));
    assert_eq!(auth.state_name().await, "Uninitialized");
}

#[tokio::test]
async fn test_settings_missing_required_field_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SETTINGS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ssoBaseUrl": server.uri(),
            "ssoEndpointAuthZ": AUTHORIZE_PATH
        })))
        .mount(&server)
        .await;

    let auth = Authenticator::new(&test_config(&server)).unwrap();
    let err = auth.token().await.unwrap_err();
    assert!(matches!(exporter_error(&err), ExporterError::Decode(_)));
}

#[tokio::test]
async fn test_rejected_credentials_keep_settings() {
    let server = MockServer::start().await;
    mount_settings(&server, 1).await;
    Mock::given(method("POST"))
        .and(path(MFA_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false
        })))
        .expect(2)
        .mount(&server)
        .await;

    let auth = Authenticator::new(&test_config(&server)).unwrap();

    let err = auth.token().await.unwrap_err();
    assert!(matches!(
        exporter_error(&err),
        ExporterError::Authentication(_)
    ));
    assert_eq!(auth.state_name().await, "SettingsReady");

    // Retry reuses the cached settings and only repeats validation
    assert!(auth.token().await.is_err());
    server.verify().await;
}

#[tokio::test]
async fn test_mfa_http_error_is_authentication_error() {
    let server = MockServer::start().await;
    mount_settings(&server, 1).await;
    Mock::given(method("POST"))
        .and(path(MFA_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let auth = Authenticator::new(&test_config(&server)).unwrap();
    let err = auth.token().await.unwrap_err();
    assert!(matches!(
        exporter_error(&err),
        ExporterError::Authentication(_)
    ));
}

#[tokio::test]
async fn test_authorize_without_location_is_missing_redirect() {
    let server = MockServer::start().await;
    mount_settings(&server, 1).await;
    mount_mfa(&server, "sess_abc", 1).await;
    Mock::given(method("GET"))
        .and(path(AUTHORIZE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let auth = Authenticator::new(&test_config(&server)).unwrap();
    let err = auth.token().await.unwrap_err();
    match exporter_error(&err) {
        ExporterError::MissingRedirect { status, body } => {
            assert_eq!(*status, 200);
            assert!(body.contains("login"));
        }
        other => panic!("expected MissingRedirect, got {other:?}"),
    }
    assert_eq!(auth.state_name().await, "SessionTokenReady");
}

#[tokio::test]
async fn test_redirect_without_code_is_missing_code() {
    let server = MockServer::start().await;
    mount_settings(&server, 1).await;
    mount_mfa(&server, "sess_abc", 1).await;
    Mock::given(method("GET"))
        .and(path(AUTHORIZE_PATH))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "https://portal.example/?error=access_denied"),
        )
        .mount(&server)
        .await;

    let auth = Authenticator::new(&test_config(&server)).unwrap();
    let err = auth.token().await.unwrap_err();
    match exporter_error(&err) {
        ExporterError::MissingCode { location } => {
            assert!(location.contains("access_denied"));
        }
        other => panic!("expected MissingCode, got {other:?}"),
    }
}

#[tokio::test]
async fn test_token_failure_keeps_session_and_retries_with_fresh_pkce() {
    let server = MockServer::start().await;
    mount_settings(&server, 1).await;
    mount_mfa(&server, "sess_abc", 1).await;
    mount_authorize(&server, "code_123", 2).await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_token(&server, "tok_xyz", 1).await;

    let auth = Authenticator::new(&test_config(&server)).unwrap();

    let err = auth.token().await.unwrap_err();
    match exporter_error(&err) {
        ExporterError::TokenExchange { status, body } => {
            assert_eq!(*status, 400);
            assert_eq!(body, "invalid_grant");
        }
        other => panic!("expected TokenExchange, got {other:?}"),
    }
    assert_eq!(auth.state_name().await, "SessionTokenReady");

    assert_eq!(auth.token().await.unwrap(), "tok_xyz");

    let requests = server.received_requests().await.unwrap();
    let challenges: Vec<String> = requests
        .iter()
        .filter(|r| r.url.path() == AUTHORIZE_PATH)
        .filter_map(|r| query_value(&r.url, "code_challenge"))
        .collect();
    assert_eq!(challenges.len(), 2);
    assert_ne!(challenges[0], challenges[1]);
    server.verify().await;
}

#[tokio::test]
async fn test_empty_access_token_is_token_exchange_error() {
    let server = MockServer::start().await;
    mount_settings(&server, 1).await;
    mount_mfa(&server, "sess_abc", 1).await;
    mount_authorize(&server, "code_123", 1).await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token_type": "Bearer",
            "expires_in": 1800
        })))
        .mount(&server)
        .await;

    let auth = Authenticator::new(&test_config(&server)).unwrap();
    let err = auth.token().await.unwrap_err();
    assert!(matches!(
        exporter_error(&err),
        ExporterError::TokenExchange { status: 200, .. }
    ));
}

#[tokio::test]
async fn test_invalidate_forces_reauthentication_but_keeps_settings() {
    let server = MockServer::start().await;
    mount_sso(&server, "tok_xyz", 2).await;

    let auth = Authenticator::new(&test_config(&server)).unwrap();
    auth.token().await.unwrap();

    auth.invalidate().await;
    assert_eq!(auth.state_name().await, "SettingsReady");

    assert_eq!(auth.token().await.unwrap(), "tok_xyz");
    // settings once, then MFA + authorize + token twice
    assert_eq!(server.received_requests().await.unwrap().len(), 7);
    server.verify().await;
}

async fn mount_authorize_without_redirect(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(AUTHORIZE_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("session expired"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_expired_session_token_is_revalidated_on_retry() {
    let server = MockServer::start().await;
    mount_settings(&server, 1).await;
    mount_mfa_with_lifetime(&server, "sess_abc", 0, 2).await;
    mount_authorize_without_redirect(&server).await;

    let auth = Authenticator::new(&test_config(&server)).unwrap();

    assert!(auth.token().await.is_err());
    assert_eq!(auth.state_name().await, "SessionTokenReady");

    assert!(auth.token().await.is_err());
    server.verify().await;
}

#[tokio::test]
async fn test_session_token_is_revalidated_after_lifetime_elapses() {
    let server = MockServer::start().await;
    mount_settings(&server, 1).await;
    mount_mfa_with_lifetime(&server, "sess_abc", 1, 2).await;
    mount_authorize_without_redirect(&server).await;

    let auth = Authenticator::new(&test_config(&server)).unwrap();

    // Within the lifetime the session token is replayed
    assert!(auth.token().await.is_err());
    assert!(auth.token().await.is_err());

    tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
    assert!(auth.token().await.is_err());

    let mfa_calls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == MFA_PATH)
        .count();
    assert_eq!(mfa_calls, 2);
    server.verify().await;
}
