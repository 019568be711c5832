//! HTTP exposition endpoint

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;

use crate::error::{ExporterError, Result};
use crate::exporter::metrics::ExporterMetrics;

/// Content type of the Prometheus text format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Builds the router serving `/metrics` and `/healthz`.
pub fn router(metrics: Arc<ExporterMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<Arc<ExporterMetrics>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        metrics.render(),
    )
}

async fn healthz_handler() -> &'static str {
    "ok"
}

/// Binds `addr` and serves until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns [`ExporterError::Io`] if the address cannot be bound.
pub async fn serve(
    addr: SocketAddr,
    metrics: Arc<ExporterMetrics>,
    shutdown: CancellationToken,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(ExporterError::from)?;
    tracing::info!("Serving metrics on http://{}/metrics", addr);

    axum::serve(listener, router(metrics))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(ExporterError::from)?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
