//! instanton-exporter - Prometheus exporter for Aruba Instant On
//!
//! Main entry point for the exporter binary.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use instanton_exporter::cli::{Cli, Commands};
use instanton_exporter::commands;
use instanton_exporter::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    init_tracing(cli.verbose, cli.json_logs);

    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;
    config.validate()?;

    match cli.command_or_default() {
        Commands::Serve { .. } => {
            tracing::info!("Starting exporter");
            commands::serve::run_serve(config).await?;
            Ok(())
        }
        Commands::Auth => {
            tracing::info!("Checking authentication");
            commands::auth::run_auth(config).await?;
            Ok(())
        }
        Commands::Scrape => {
            tracing::info!("Running a single collection");
            commands::scrape::run_scrape(config).await?;
            Ok(())
        }
    }
}

/// Initialize tracing with an env filter, falling back to
/// `instanton_exporter=info` (or `debug` with `--verbose`).
///
/// Logs go to stderr so `scrape` output on stdout stays clean.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose {
        "instanton_exporter=debug"
    } else {
        "instanton_exporter=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
