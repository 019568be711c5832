//! Instant On API response types
//!
//! Field names follow the API's camelCase JSON. Every field defaults so a
//! firmware update that drops one does not break collection.

use serde::{Deserialize, Serialize};

/// A site (one customer location).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Site {
    pub id: String,
    pub name: String,
    pub health: String,
    pub status: String,
    #[serde(rename = "timezoneIana")]
    pub time_zone: String,
}

/// A managed device: access point, switch or gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub device_type: String,
    pub model: String,
    pub serial_number: String,
    pub mac_address: String,
    pub ip_address: String,
    pub status: String,
    pub operational_state: String,
    pub uptime_in_seconds: i64,
}

impl Device {
    /// `deviceType` value used for wireless access points.
    pub const ACCESS_POINT: &'static str = "accessPoint";

    /// Whether this device is a wireless access point.
    pub fn is_access_point(&self) -> bool {
        self.device_type == Self::ACCESS_POINT
    }
}

/// A wireless client as reported by `/clientSummary`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WirelessClient {
    pub id: String,
    pub name: String,
    pub host_name: String,
    pub client_type: String,
    pub wireless_network_name: String,
    pub wireless_network_id: String,
    pub ip_address: String,
    pub mac_address: String,
    /// Access point the client is associated with.
    pub device_name: String,
    pub device_id: String,
    pub connection_duration_in_seconds: i64,
    pub health: String,
    pub status: String,
    pub wireless_band: String,
    pub signal_quality: String,
    pub signal_in_dbm: i64,
    pub snr_in_db: i64,
}

/// A wired client as reported by `/wiredClientSummary`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WiredClient {
    pub id: String,
    pub name: String,
    pub mac_address: String,
    pub client_type: String,
    pub is_voice_device: bool,
    pub ip_address: String,
}

/// Paged list envelope used by every list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default)]
    pub total_count: i64,
    #[serde(default = "Vec::new")]
    pub elements: Vec<T>,
}

impl<T> Default for ListResponse<T> {
    fn default() -> Self {
        Self {
            total_count: 0,
            elements: Vec::new(),
        }
    }
}

pub type SitesResponse = ListResponse<Site>;
pub type InventoryResponse = ListResponse<Device>;
pub type ClientSummaryResponse = ListResponse<WirelessClient>;
pub type WiredClientSummaryResponse = ListResponse<WiredClient>;
