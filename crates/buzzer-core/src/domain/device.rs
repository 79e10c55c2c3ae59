//! The device record: one buzzer's identity and last known state.
//!
//! # Connection lifecycle (for beginners)
//!
//! A device moves through these states:
//!
//! ```text
//!                 connect()            probe "ok"
//! Disconnected ─────────────► Connecting ─────────► Connected
//!      ▲                          │                    │
//!      │                          │ probe failed       │ monitor poll failed
//!      │ disconnect()             ▼                    ▼
//!      └────────────────────── Error ◄─────────────────┘
//! ```
//!
//! No state is terminal: `Error` and `Disconnected` both recover through a
//! fresh connect attempt.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a device, generated when the device is discovered.
pub type DeviceId = Uuid;

/// Port of the buzzer control endpoint when the device does not say otherwise.
pub const DEFAULT_PORT: u16 = 80;

/// Connectivity status of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceStatus {
    /// No session; the initial state of every discovered device.
    #[default]
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// The last health probe answered `"ok"`.
    Connected,
    /// The last connect attempt or monitor poll failed.
    Error,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeviceStatus::Disconnected => "disconnected",
            DeviceStatus::Connecting => "connecting",
            DeviceStatus::Connected => "connected",
            DeviceStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// A snapshot of one buzzer.
///
/// Devices are plain values.  The registry in the hub owns the authoritative
/// copy and hands out clones; nobody observes a `Device` changing underneath
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    /// Display name, as reported by the device's `device` status field.
    pub name: String,
    pub ip: IpAddr,
    /// Hardware address in lowercase hyphenated form (`aa-bb-cc-dd-ee-ff`).
    pub mac: String,
    pub port: u16,
    pub status: DeviceStatus,
    pub last_seen: DateTime<Utc>,
}

impl Device {
    /// Builds the record for a device that just answered a discovery probe.
    ///
    /// The id is freshly generated, the status starts at
    /// [`DeviceStatus::Disconnected`], and the hardware address is normalized.
    pub fn discovered(name: impl Into<String>, ip: IpAddr, raw_mac: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            ip,
            mac: raw_mac.map(normalize_mac).unwrap_or_default(),
            port: DEFAULT_PORT,
            status: DeviceStatus::Disconnected,
            last_seen: Utc::now(),
        }
    }

    /// Address of the device's control endpoint.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    /// Returns `true` when the device name starts with `prefix`, ignoring case.
    ///
    /// An empty prefix matches every device.
    pub fn name_matches(&self, prefix: &str) -> bool {
        let name = self.name.to_lowercase();
        name.starts_with(&prefix.to_lowercase())
    }
}

/// Normalizes a hardware address: lowercase, `:` replaced with `-`.
///
/// ```
/// assert_eq!(buzzer_core::normalize_mac("AA:BB:CC:DD:EE:FF"), "aa-bb-cc-dd-ee-ff");
/// ```
pub fn normalize_mac(raw: &str) -> String {
    raw.to_lowercase().replace(':', "-")
}
