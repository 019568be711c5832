//! Error types for the Instant On exporter
//!
//! This module defines all error types used throughout the exporter,
//! using `thiserror` for ergonomic error handling. Each stage of the
//! authentication pipeline fails with its own variant so callers can tell
//! where the chain broke.

use thiserror::Error;

/// Main error type for exporter operations
///
/// Authentication stages carry the HTTP status and raw response body where
/// one exists, since the SSO provider reports most failures only in the body.
#[derive(Error, Debug)]
pub enum ExporterError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network or connection failure before any response was received
    #[error("Transport error: {0}")]
    Transport(String),

    /// Unexpected HTTP status from the SSO provider
    #[error("Protocol error: status {status}, body: {body}")]
    Protocol {
        /// HTTP status code returned
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Response body did not match the expected JSON shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// The OS random source could not produce PKCE material
    #[error("Entropy error: {0}")]
    Entropy(String),

    /// Credentials rejected by the MFA validation endpoint
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Authorization endpoint answered without a `Location` header
    #[error("No redirect location found, status: {status}, body: {body}")]
    MissingRedirect {
        /// HTTP status code returned
        status: u16,
        /// Raw response body, kept for diagnostics
        body: String,
    },

    /// Redirect location carried no authorization code
    #[error("Authorization code not found in redirect URL: {location}")]
    MissingCode {
        /// The `Location` header value
        location: String,
    },

    /// Token endpoint rejected the authorization code exchange
    #[error("Token exchange failed: status {status}, body: {body}")]
    TokenExchange {
        /// HTTP status code returned
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Instant On API returned a non-success status
    #[error("API returned status {status}: {body}")]
    Api {
        /// HTTP status code returned
        status: u16,
        /// Raw response body
        body: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ExporterError {
    /// Returns the HTTP status attached to this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Protocol { status, .. }
            | Self::MissingRedirect { status, .. }
            | Self::TokenExchange { status, .. }
            | Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ExporterError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Result type alias for exporter operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation. Use
/// `downcast_ref::<ExporterError>()` to inspect the failing stage.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = ExporterError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_protocol_error_display_includes_status_and_body() {
        let error = ExporterError::Protocol {
            status: 500,
            body: "upstream down".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Protocol error: status 500, body: upstream down"
        );
    }

    #[test]
    fn test_missing_code_display() {
        let error = ExporterError::MissingCode {
            location: "https://portal.example/?state=1".to_string(),
        };
        assert!(error.to_string().contains("https://portal.example/?state=1"));
    }

    #[test]
    fn test_authentication_error_display() {
        let error = ExporterError::Authentication("MFA validation was not successful".to_string());
        assert_eq!(
            error.to_string(),
            "Authentication error: MFA validation was not successful"
        );
    }

    #[test]
    fn test_status_accessor() {
        let error = ExporterError::TokenExchange {
            status: 400,
            body: String::new(),
        };
        assert_eq!(error.status(), Some(400));
        assert_eq!(ExporterError::Decode("x".to_string()).status(), None);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: ExporterError = io_error.into();
        assert!(matches!(error, ExporterError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: ExporterError = json_error.into();
        assert!(matches!(error, ExporterError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: : yaml").unwrap_err();
        let error: ExporterError = yaml_error.into();
        assert!(matches!(error, ExporterError::Yaml(_)));
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let result: Result<()> = Err(ExporterError::Entropy("no source".to_string()).into());
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExporterError>(),
            Some(ExporterError::Entropy(_))
        ));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ExporterError>();
    }
}
