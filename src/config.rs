//! Configuration management for the Instant On exporter
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! Later sources win: file, then environment, then command line.

use crate::error::{ExporterError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Default location of the SSO provider topology document
pub const DEFAULT_SETTINGS_URL: &str = "https://portal.arubainstanton.com/settings.json";
/// Default MFA validation endpoint
pub const DEFAULT_MFA_URL: &str = "https://sso.arubainstanton.com/aio/api/v1/mfa/validate/full";
/// Default redirect target bound to the authorization code
pub const DEFAULT_REDIRECT_URI: &str = "https://portal.arubainstanton.com";
/// Default Instant On API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://portal.instant-on.hpe.com/api";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Service account credentials
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// SSO provider endpoints and request behavior
    #[serde(default)]
    pub sso: SsoConfig,
    /// Instant On API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Metrics endpoint and scrape loop settings
    #[serde(default)]
    pub exporter: ExporterConfig,
    /// Which optional collections to run
    #[serde(default)]
    pub collector: CollectorConfig,
}

/// Service account credentials
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Account username (usually an email address)
    #[serde(default)]
    pub username: String,
    /// Account password
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// SSO provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsoConfig {
    /// URL of the provider settings document
    #[serde(default = "default_settings_url")]
    pub settings_url: String,

    /// MFA validation endpoint
    #[serde(default = "default_mfa_url")]
    pub mfa_url: String,

    /// Redirect target sent on both the authorization and token requests
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Scopes requested on the authorization request
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Per-request timeout for SSO calls (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_settings_url() -> String {
    DEFAULT_SETTINGS_URL.to_string()
}

fn default_mfa_url() -> String {
    DEFAULT_MFA_URL.to_string()
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

fn default_scope() -> String {
    "profile openid".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for SsoConfig {
    fn default() -> Self {
        Self {
            settings_url: default_settings_url(),
            mfa_url: default_mfa_url(),
            redirect_uri: default_redirect_uri(),
            scope: default_scope(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl SsoConfig {
    /// Per-request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Instant On API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API base URL, without a trailing slash
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// Value sent in the `x-ion-api-version` header
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-request timeout for API calls (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_api_version() -> String {
    "7".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            api_version: default_api_version(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Metrics endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Socket address the `/metrics` server binds to
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Pause between collection passes (seconds)
    #[serde(default = "default_scrape_interval")]
    pub scrape_interval_seconds: u64,
}

fn default_listen_address() -> String {
    "0.0.0.0:9101".to_string()
}

fn default_scrape_interval() -> u64 {
    30
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            scrape_interval_seconds: default_scrape_interval(),
        }
    }
}

impl ExporterConfig {
    /// Scrape interval as a [`Duration`]
    pub fn scrape_interval(&self) -> Duration {
        Duration::from_secs(self.scrape_interval_seconds)
    }
}

/// Collector toggles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Fetch `/wiredClientSummary` per site. The endpoint answers 404 on
    /// current firmware, so the gauge is reported as 0 unless enabled.
    #[serde(default)]
    pub wired_clients: bool,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ExporterError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ExporterError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(username) = std::env::var("ARUBA_USERNAME") {
            self.credentials.username = username;
        }

        if let Ok(password) = std::env::var("ARUBA_PASSWORD") {
            self.credentials.password = password;
        }

        if let Ok(url) = std::env::var("INSTANTON_SETTINGS_URL") {
            tracing::debug!(settings_url = %url, "Env override: INSTANTON_SETTINGS_URL");
            self.sso.settings_url = url;
        }

        if let Ok(url) = std::env::var("INSTANTON_MFA_URL") {
            tracing::debug!(mfa_url = %url, "Env override: INSTANTON_MFA_URL");
            self.sso.mfa_url = url;
        }

        if let Ok(url) = std::env::var("INSTANTON_API_BASE_URL") {
            tracing::debug!(base_url = %url, "Env override: INSTANTON_API_BASE_URL");
            self.api.base_url = url;
        }

        if let Ok(addr) = std::env::var("INSTANTON_LISTEN_ADDRESS") {
            tracing::debug!(listen_address = %addr, "Env override: INSTANTON_LISTEN_ADDRESS");
            self.exporter.listen_address = addr;
        }

        if let Ok(interval) = std::env::var("INSTANTON_SCRAPE_INTERVAL_SECONDS") {
            match interval.parse::<u64>() {
                Ok(v) => self.exporter.scrape_interval_seconds = v,
                Err(_) => {
                    tracing::warn!("Invalid INSTANTON_SCRAPE_INTERVAL_SECONDS: {}", interval)
                }
            }
        }

        if let Ok(timeout) = std::env::var("INSTANTON_REQUEST_TIMEOUT_SECONDS") {
            match timeout.parse::<u64>() {
                Ok(v) => {
                    self.sso.request_timeout_seconds = v;
                    self.api.request_timeout_seconds = v;
                }
                Err(_) => {
                    tracing::warn!("Invalid INSTANTON_REQUEST_TIMEOUT_SECONDS: {}", timeout)
                }
            }
        }

        if let Ok(wired) = std::env::var("INSTANTON_WIRED_CLIENTS") {
            match wired.parse::<bool>() {
                Ok(v) => {
                    self.collector.wired_clients = v;
                    tracing::debug!(wired_clients = v, "Env override: INSTANTON_WIRED_CLIENTS");
                }
                Err(_) => {
                    tracing::warn!("Invalid value for INSTANTON_WIRED_CLIENTS: {}", wired);
                }
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(crate::cli::Commands::Serve { listen, interval }) = &cli.command {
            if let Some(listen) = listen {
                self.exporter.listen_address = listen.clone();
            }
            if let Some(interval) = interval {
                self.exporter.scrape_interval_seconds = *interval;
            }
        }
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges
    /// and that required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.credentials.username.is_empty() || self.credentials.password.is_empty() {
            return Err(ExporterError::Config(
                "ARUBA_USERNAME and ARUBA_PASSWORD are required".to_string(),
            )
            .into());
        }

        for (name, value) in [
            ("sso.settings_url", &self.sso.settings_url),
            ("sso.mfa_url", &self.sso.mfa_url),
            ("sso.redirect_uri", &self.sso.redirect_uri),
            ("api.base_url", &self.api.base_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| ExporterError::Config(format!("Invalid {}: {} ({})", name, value, e)))?;
        }

        if self.sso.request_timeout_seconds == 0 || self.api.request_timeout_seconds == 0 {
            return Err(ExporterError::Config(
                "request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.exporter.scrape_interval_seconds == 0 {
            return Err(ExporterError::Config(
                "exporter.scrape_interval_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        self.listen_address()?;

        Ok(())
    }

    /// Parsed listen address for the metrics server
    pub fn listen_address(&self) -> Result<SocketAddr> {
        self.exporter.listen_address.parse().map_err(|e| {
            ExporterError::Config(format!(
                "Invalid exporter.listen_address {}: {}",
                self.exporter.listen_address, e
            ))
            .into()
        })
    }
}
