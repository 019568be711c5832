//! Prometheus exporter
//!
//! - [`metrics`]: gauge registry and exposition rendering
//! - [`collector`]: one collection pass over the API
//! - [`server`]: axum endpoint serving the rendered registry

pub mod collector;
pub mod metrics;
pub mod server;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

pub use collector::Collector;
pub use metrics::ExporterMetrics;

/// Runs a collection pass every `interval` until `shutdown` is cancelled.
///
/// The first pass starts immediately. A pass in flight when shutdown is
/// requested is dropped.
pub async fn run_collector(collector: Collector, interval: Duration, shutdown: CancellationToken) {
    tracing::info!(interval_seconds = interval.as_secs(), "Collector started");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            ok = collector.collect() => {
                if !ok {
                    tracing::warn!("Collection pass failed; retrying in {:?}", interval);
                }
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::info!("Collector stopped");
}
