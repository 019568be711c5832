//! Instant On exporter library
//!
//! Authenticates against the Aruba Instant On SSO provider and exports
//! site, device and client telemetry as Prometheus gauges.
//!
//! # Architecture
//!
//! - `auth`: settings discovery, credential validation, PKCE authorization
//!   and token exchange, driven by the [`Authenticator`] state machine
//! - `api`: REST client and response types for the Instant On portal
//! - `exporter`: gauge registry, collector loop and HTTP endpoint
//! - `config`: configuration loading and validation
//! - `error`: error types and result alias
//! - `cli` / `commands`: command-line interface and handlers
//!
//! # Example
//!
//! ```no_run
//! use instanton_exporter::{Authenticator, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let auth = Authenticator::new(&config)?;
//!     let _bearer = auth.token().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exporter;

// Re-export commonly used types
pub use auth::Authenticator;
pub use config::Config;
pub use error::{ExporterError, Result};
