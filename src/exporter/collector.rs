//! One collection pass over all sites
//!
//! Fetches sites, then per site the inventory and client summaries, and
//! writes the results into [`ExporterMetrics`]. Failures are logged and the
//! pass continues with whatever can still be collected.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use crate::api::{ApiClient, Device, Site, WirelessClient};
use crate::exporter::metrics::{self as m, ExporterMetrics};

/// Pulls telemetry from the API into the metrics registry.
#[derive(Debug, Clone)]
pub struct Collector {
    client: ApiClient,
    metrics: Arc<ExporterMetrics>,
    wired_clients: bool,
}

impl Collector {
    /// Creates a collector writing into `metrics`.
    ///
    /// With `wired_clients` off the wired gauge is reported as 0 without a
    /// request.
    pub fn new(client: ApiClient, metrics: Arc<ExporterMetrics>, wired_clients: bool) -> Self {
        Self {
            client,
            metrics,
            wired_clients,
        }
    }

    /// Runs one pass. Returns `false` if the site list could not be fetched.
    pub async fn collect(&self) -> bool {
        let started = Instant::now();
        let success = self.collect_sites().await;

        self.metrics
            .set_gauge(m::SCRAPE_SUCCESS, &[], if success { 1.0 } else { 0.0 });
        self.metrics
            .set_gauge(m::SCRAPE_DURATION, &[], started.elapsed().as_secs_f64());
        success
    }

    async fn collect_sites(&self) -> bool {
        let sites = match self.client.sites().await {
            Ok(sites) => sites,
            Err(e) => {
                tracing::error!("Failed to get sites: {:#}", e);
                return false;
            }
        };

        self.metrics
            .set_gauge(m::SITES_TOTAL, &[], sites.total_count as f64);

        for site in &sites.elements {
            self.metrics.set_gauge(
                m::SITE_INFO,
                &[
                    ("site_id", site.id.as_str()),
                    ("site_name", site.name.as_str()),
                    ("health", site.health.as_str()),
                    ("status", site.status.as_str()),
                    ("timezone", site.time_zone.as_str()),
                ],
                1.0,
            );
            self.collect_site(site).await;
        }

        tracing::debug!(sites = sites.elements.len(), "Collection pass complete");
        true
    }

    async fn collect_site(&self, site: &Site) {
        let site_labels = [("site_id", site.id.as_str()), ("site_name", site.name.as_str())];

        let inventory = match self.client.inventory(&site.id).await {
            Ok(inventory) => inventory,
            Err(e) => {
                tracing::warn!("Failed to get inventory for site {}: {:#}", site.name, e);
                return;
            }
        };

        self.metrics
            .set_gauge(m::DEVICES_TOTAL, &site_labels, inventory.total_count as f64);

        for device in &inventory.elements {
            self.record_device(site, device);
        }

        match self.client.client_summary(&site.id).await {
            Ok(clients) => {
                self.metrics.set_gauge(
                    m::WIRELESS_CLIENTS_TOTAL,
                    &site_labels,
                    clients.total_count as f64,
                );
                self.record_client_distribution(site, &inventory.elements, &clients.elements);
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to get wireless clients for site {}: {:#}",
                    site.name,
                    e
                );
            }
        }

        let wired_total = if self.wired_clients {
            match self.client.wired_client_summary(&site.id).await {
                Ok(wired) => Some(wired.total_count as f64),
                Err(e) => {
                    tracing::warn!("Failed to get wired clients for site {}: {:#}", site.name, e);
                    None
                }
            }
        } else {
            Some(0.0)
        };

        if let Some(total) = wired_total {
            self.metrics
                .set_gauge(m::WIRED_CLIENTS_TOTAL, &site_labels, total);
        }
    }

    fn record_device(&self, site: &Site, device: &Device) {
        self.metrics.set_gauge(
            m::DEVICE_INFO,
            &[
                ("site_id", site.id.as_str()),
                ("site_name", site.name.as_str()),
                ("device_id", device.id.as_str()),
                ("device_name", device.name.as_str()),
                ("device_type", device.device_type.as_str()),
                ("model", device.model.as_str()),
                ("serial_number", device.serial_number.as_str()),
                ("mac_address", device.mac_address.as_str()),
                ("ip_address", device.ip_address.as_str()),
                ("status", device.status.as_str()),
                ("operational_state", device.operational_state.as_str()),
            ],
            1.0,
        );

        self.metrics.set_gauge(
            m::DEVICE_UPTIME,
            &[
                ("site_id", site.id.as_str()),
                ("site_name", site.name.as_str()),
                ("device_id", device.id.as_str()),
                ("device_name", device.name.as_str()),
            ],
            device.uptime_in_seconds as f64,
        );
    }

    /// Per-SSID and per-AP client counts. Every access point in the
    /// inventory is reported, at 0 when it has no clients.
    fn record_client_distribution(
        &self,
        site: &Site,
        devices: &[Device],
        clients: &[WirelessClient],
    ) {
        for (ssid, count) in count_by_network(clients) {
            self.metrics.set_gauge(
                m::CLIENTS_BY_NETWORK,
                &[
                    ("site_id", site.id.as_str()),
                    ("site_name", site.name.as_str()),
                    ("network_ssid", ssid),
                ],
                count as f64,
            );
        }

        // device id -> (device name, client count)
        let mut per_ap: HashMap<&str, (&str, usize)> = devices
            .iter()
            .filter(|d| d.is_access_point())
            .map(|d| (d.id.as_str(), (d.name.as_str(), 0)))
            .collect();
        for client in clients {
            per_ap
                .entry(client.device_id.as_str())
                .or_insert((client.device_name.as_str(), 0))
                .1 += 1;
        }

        for (device_id, (device_name, count)) in per_ap {
            self.metrics.set_gauge(
                m::CLIENTS_BY_AP,
                &[
                    ("site_id", site.id.as_str()),
                    ("site_name", site.name.as_str()),
                    ("device_id", device_id),
                    ("device_name", device_name),
                ],
                count as f64,
            );
        }
    }
}

fn count_by_network(clients: &[WirelessClient]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for client in clients {
        *counts
            .entry(client.wireless_network_name.as_str())
            .or_default() += 1;
    }
    counts
}
