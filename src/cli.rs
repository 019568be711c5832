//! Command-line interface definition for the exporter
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for serving metrics, checking authentication,
//! and running a single scrape.

use clap::{Parser, Subcommand};

/// Prometheus exporter for Aruba Instant On
///
/// Authenticates with the Instant On SSO provider and publishes site,
/// device and client telemetry on `/metrics`.
#[derive(Parser, Debug, Clone)]
#[command(name = "instanton-exporter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Command to execute (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Serve Prometheus metrics, collecting on a fixed interval
    Serve {
        /// Override the listen address (e.g. 0.0.0.0:9101)
        #[arg(short, long)]
        listen: Option<String>,

        /// Override the scrape interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Authenticate and list the sites visible to the account
    Auth,

    /// Run one collection pass and print the metrics to stdout
    Scrape,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The command to run, with `serve` as the default
    pub fn command_or_default(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve {
            listen: None,
            interval: None,
        })
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            command: None,
        }
    }
}
