//! Domain events: what observers of the hub are told about devices.
//!
//! Events are fire-and-forget notifications.  They are not persisted and a
//! subscriber that joins late never sees what happened before it joined.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::device::DeviceId;

/// Name reported for a device id the registry does not know.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown";

/// What happened to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuzzerEventKind {
    Connected,
    Disconnected,
    Pressed,
    Released,
    Error,
}

/// An immutable notification about one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuzzerEvent {
    pub device_id: DeviceId,
    /// Device name as the registry knew it when the event was emitted.
    pub device_name: String,
    pub kind: BuzzerEventKind,
    /// Capture time on the hub, not device time.
    pub timestamp: DateTime<Utc>,
    /// Raw message text for press/release events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl BuzzerEvent {
    /// Creates an event stamped with the current time.
    pub fn new(
        device_id: DeviceId,
        device_name: impl Into<String>,
        kind: BuzzerEventKind,
        payload: Option<String>,
    ) -> Self {
        Self {
            device_id,
            device_name: device_name.into(),
            kind,
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Classifies a raw device message: anything mentioning "press" (in any
/// case) is a press, everything else is a release.
pub fn classify_message(message: &str) -> BuzzerEventKind {
    if message.to_lowercase().contains("press") {
        BuzzerEventKind::Pressed
    } else {
        BuzzerEventKind::Released
    }
}
