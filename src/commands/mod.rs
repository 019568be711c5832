/*!
Command handlers for the CLI

- `serve`: collector loop plus the `/metrics` endpoint
- `auth`: authenticate once and list the visible sites
- `scrape`: run a single collection and print the exposition
*/

use std::sync::Arc;

use crate::api::ApiClient;
use crate::auth::Authenticator;
use crate::config::Config;
use crate::error::Result;
use crate::exporter::{Collector, ExporterMetrics};

/// Authenticator and API client sharing one token cache.
fn build_client(config: &Config) -> Result<ApiClient> {
    let auth = Arc::new(Authenticator::new(config)?);
    ApiClient::new(&config.api, auth)
}

// Exporter command handler
pub mod serve {
    //! Long-running exporter.
    //!
    //! Authenticates once up front so credential problems show in the log
    //! immediately, then runs the collector loop and the HTTP server until
    //! Ctrl-C.

    use super::*;
    use crate::exporter::{run_collector, server};
    use tokio_util::sync::CancellationToken;

    const STALE_AFTER_PASSES: u32 = 3;

    /// Start the exporter
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration (consumed)
    pub async fn run_serve(config: Config) -> Result<()> {
        let addr = config.listen_address()?;
        let client = build_client(&config)?;

        match client.sites().await {
            Ok(sites) => tracing::info!(
                "Authentication check passed; {} site(s) visible",
                sites.total_count
            ),
            Err(e) => tracing::error!("Authentication check failed: {:#}", e),
        }

        // Series missed for three passes in a row are dropped
        let idle_timeout = config.exporter.scrape_interval() * STALE_AFTER_PASSES;
        let metrics = Arc::new(ExporterMetrics::with_idle_timeout(idle_timeout));
        let collector = Collector::new(
            client,
            Arc::clone(&metrics),
            config.collector.wired_clients,
        );

        let shutdown = CancellationToken::new();
        let ctrl_c = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                return;
            }
            tracing::info!("Shutdown requested");
            ctrl_c.cancel();
        });

        let collector_task = tokio::spawn(run_collector(
            collector,
            config.exporter.scrape_interval(),
            shutdown.clone(),
        ));

        let served = server::serve(addr, metrics, shutdown.clone()).await;
        shutdown.cancel();

        if let Err(e) = collector_task.await {
            tracing::warn!("Collector task ended abnormally: {}", e);
        }
        served
    }
}

// Authentication check handler
pub mod auth {
    use super::*;

    /// Authenticate and print the sites the account can see
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration (consumed)
    pub async fn run_auth(config: Config) -> Result<()> {
        let client = build_client(&config)?;

        let sites = match client.sites().await {
            Ok(sites) => sites,
            Err(e) => {
                eprintln!("Authentication failed: {:#}", e);
                return Err(e);
            }
        };

        println!("Authenticated as {}", config.credentials.username);
        println!("Sites: {}", sites.total_count);
        for site in &sites.elements {
            println!("  {}  {}  ({})", site.id, site.name, site.status);
        }
        Ok(())
    }
}

// One-shot collection handler
pub mod scrape {
    use super::*;

    /// Run one collection pass and print the exposition to stdout
    ///
    /// Fails when the site list could not be fetched; partial per-site
    /// failures are logged and still print.
    pub async fn run_scrape(config: Config) -> Result<()> {
        let client = build_client(&config)?;
        let metrics = Arc::new(ExporterMetrics::new());
        let collector = Collector::new(
            client,
            Arc::clone(&metrics),
            config.collector.wired_clients,
        );

        let ok = collector.collect().await;
        print!("{}", metrics.render());

        if !ok {
            anyhow::bail!("collection failed: site list could not be fetched");
        }
        Ok(())
    }
}
