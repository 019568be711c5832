//! Prometheus gauges exported for Instant On
//!
//! The recorder is an explicit object built once at startup and shared by
//! the collector (which writes) and the HTTP server (which renders). Nothing
//! is installed as the process-global `metrics` recorder.
//!
//! With an idle timeout, series not set again within the timeout are dropped
//! at render time. A device whose labels change (new status, new IP) then
//! leaves no stale series behind.
//!
//! # Metrics
//!
//! - `aruba_instant_on_sites_total`: number of sites
//! - `aruba_instant_on_site_info`: site labels, value 1
//! - `aruba_instant_on_devices_total`: devices per site
//! - `aruba_instant_on_device_info`: device labels, value 1
//! - `aruba_instant_on_device_uptime_seconds`: device uptime
//! - `aruba_instant_on_wireless_clients_total`: wireless clients per site
//! - `aruba_instant_on_wired_clients_total`: wired clients per site
//! - `aruba_instant_on_clients_by_network`: wireless clients per SSID
//! - `aruba_instant_on_clients_by_ap`: wireless clients per access point
//! - `aruba_instant_on_scrape_success`: 1 if the last pass fetched sites
//! - `aruba_instant_on_scrape_duration_seconds`: duration of the last pass

use std::time::Duration;

use metrics::{Key, KeyName, Label, Recorder, SharedString, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use metrics_util::MetricKindMask;

pub const SITES_TOTAL: &str = "aruba_instant_on_sites_total";
pub const SITE_INFO: &str = "aruba_instant_on_site_info";
pub const DEVICES_TOTAL: &str = "aruba_instant_on_devices_total";
pub const DEVICE_INFO: &str = "aruba_instant_on_device_info";
pub const DEVICE_UPTIME: &str = "aruba_instant_on_device_uptime_seconds";
pub const WIRELESS_CLIENTS_TOTAL: &str = "aruba_instant_on_wireless_clients_total";
pub const WIRED_CLIENTS_TOTAL: &str = "aruba_instant_on_wired_clients_total";
pub const CLIENTS_BY_NETWORK: &str = "aruba_instant_on_clients_by_network";
pub const CLIENTS_BY_AP: &str = "aruba_instant_on_clients_by_ap";
pub const SCRAPE_SUCCESS: &str = "aruba_instant_on_scrape_success";
pub const SCRAPE_DURATION: &str = "aruba_instant_on_scrape_duration_seconds";

const DESCRIPTIONS: &[(&str, &str, Option<Unit>)] = &[
    (SITES_TOTAL, "Total number of sites", None),
    (SITE_INFO, "Site information", None),
    (DEVICES_TOTAL, "Total number of devices", None),
    (DEVICE_INFO, "Device information", None),
    (DEVICE_UPTIME, "Device uptime in seconds", Some(Unit::Seconds)),
    (WIRELESS_CLIENTS_TOTAL, "Total number of wireless clients", None),
    (WIRED_CLIENTS_TOTAL, "Total number of wired clients", None),
    (CLIENTS_BY_NETWORK, "Number of clients by network SSID", None),
    (CLIENTS_BY_AP, "Number of clients by access point", None),
    (
        SCRAPE_SUCCESS,
        "Whether the last collection pass fetched the site list",
        None,
    ),
    (
        SCRAPE_DURATION,
        "Duration of the last collection pass",
        Some(Unit::Seconds),
    ),
];

/// Gauge registry rendered on `/metrics`.
pub struct ExporterMetrics {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl ExporterMetrics {
    /// Builds a recorder whose series never expire.
    pub fn new() -> Self {
        Self::from_builder(PrometheusBuilder::new())
    }

    /// Builds a recorder that drops gauges not set within `idle_timeout`.
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self::from_builder(
            PrometheusBuilder::new().idle_timeout(MetricKindMask::GAUGE, Some(idle_timeout)),
        )
    }

    fn from_builder(builder: PrometheusBuilder) -> Self {
        let recorder = builder.build_recorder();
        let handle = recorder.handle();

        for (name, help, unit) in DESCRIPTIONS {
            recorder.describe_gauge(KeyName::from(*name), unit.clone(), SharedString::from(*help));
        }

        Self { recorder, handle }
    }

    /// Sets a gauge identified by name and label pairs.
    pub fn set_gauge(&self, name: &'static str, labels: &[(&'static str, &str)], value: f64) {
        let labels: Vec<Label> = labels
            .iter()
            .map(|(key, value)| Label::new(*key, value.to_string()))
            .collect();
        let key = Key::from_parts(name, labels);
        self.recorder.register_gauge(&key).set(value);
    }

    /// Renders all gauges in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl Default for ExporterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExporterMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExporterMetrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_gauge_with_labels() {
        let metrics = ExporterMetrics::new();
        metrics.set_gauge(
            DEVICES_TOTAL,
            &[("site_id", "s1"), ("site_name", "HQ")],
            3.0,
        );
        let out = metrics.render();
        assert!(
            out.contains(r#"aruba_instant_on_devices_total{site_id="s1",site_name="HQ"} 3"#),
            "unexpected exposition:\n{out}"
        );
    }

    #[test]
    fn test_render_contains_help_text() {
        let metrics = ExporterMetrics::new();
        metrics.set_gauge(SITES_TOTAL, &[], 2.0);
        let out = metrics.render();
        assert!(out.contains("# HELP aruba_instant_on_sites_total Total number of sites"));
        assert!(out.contains("aruba_instant_on_sites_total 2"));
    }

    #[test]
    fn test_set_gauge_overwrites_previous_value() {
        let metrics = ExporterMetrics::new();
        metrics.set_gauge(SITES_TOTAL, &[], 2.0);
        metrics.set_gauge(SITES_TOTAL, &[], 5.0);
        let out = metrics.render();
        assert!(out.contains("aruba_instant_on_sites_total 5"));
        assert!(!out.contains("aruba_instant_on_sites_total 2"));
    }

    #[test]
    fn test_idle_series_are_dropped() {
        let metrics = ExporterMetrics::with_idle_timeout(Duration::from_millis(50));
        metrics.set_gauge(DEVICE_INFO, &[("device_id", "d1"), ("status", "up")], 1.0);
        metrics.set_gauge(SITES_TOTAL, &[], 1.0);
        assert!(metrics.render().contains(r#"status="up""#));

        std::thread::sleep(Duration::from_millis(150));
        metrics.set_gauge(DEVICE_INFO, &[("device_id", "d1"), ("status", "down")], 1.0);
        metrics.set_gauge(SITES_TOTAL, &[], 1.0);

        let out = metrics.render();
        assert!(!out.contains(r#"status="up""#), "stale series kept:\n{out}");
        assert!(out.contains(r#"status="down""#));
        assert!(out.contains("aruba_instant_on_sites_total 1"));
    }

    #[test]
    fn test_separate_registries_do_not_share_values() {
        let a = ExporterMetrics::new();
        let b = ExporterMetrics::new();
        a.set_gauge(SITES_TOTAL, &[], 1.0);
        assert!(!b.render().contains("aruba_instant_on_sites_total 1"));
    }
}
