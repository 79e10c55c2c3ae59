//! In-memory registry of every buzzer the hub knows about.
//!
//! The registry is the single source of truth for device records.  Entries
//! are only ever added through [`DeviceRegistry::merge`], which never
//! replaces a record that is already present, and attributes only change
//! through the named update operations (`set_status`, `rename`, `touch`,
//! `relocate`).
//!
//! Callers always receive cloned snapshots; nothing outside the registry
//! holds a mutable reference to a [`Device`].

use std::collections::HashMap;
use std::net::IpAddr;

use buzzer_core::{Device, DeviceId, DeviceStatus, UNKNOWN_DEVICE_NAME};
use chrono::{DateTime, Utc};

/// Map from device id to device record.
///
/// Stored behind a `tokio::sync::Mutex` by the manager so that discovery
/// merges, status updates from the event pump, and caller queries are
/// serialized.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<DeviceId, Device>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `device` unless it is already known, and returns the record
    /// the registry holds for it.
    ///
    /// A device is already known when its id is present, or when another
    /// record carries the same (non-empty) hardware address.  A known id is
    /// returned untouched.  A hardware-address match keeps its id, name and
    /// status but is [relocated](Self::relocate) to the address the sweep
    /// found it at, so a buzzer that changed its DHCP lease stays reachable.
    pub fn merge(&mut self, device: Device) -> Device {
        if let Some(existing) = self.devices.get(&device.id) {
            return existing.clone();
        }
        let known = self.find_by_mac(&device.mac).map(|existing| existing.id);
        if let Some(moved) = known.and_then(|id| self.relocate(id, device.ip, device.last_seen)) {
            return moved;
        }
        self.devices.insert(device.id, device.clone());
        device
    }

    /// Moves a known device to `ip` and records it as seen at `seen_at`.
    ///
    /// Returns the updated record, or `None` for an unknown id.
    pub fn relocate(&mut self, id: DeviceId, ip: IpAddr, seen_at: DateTime<Utc>) -> Option<Device> {
        let device = self.devices.get_mut(&id)?;
        device.ip = ip;
        device.last_seen = seen_at;
        Some(device.clone())
    }

    /// Returns a snapshot of all devices.
    pub fn all(&self) -> Vec<Device> {
        self.devices.values().cloned().collect()
    }

    pub fn get(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(&id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Updates the status of a known device; unknown ids are ignored.
    pub fn set_status(&mut self, id: DeviceId, status: DeviceStatus) {
        if let Some(device) = self.devices.get_mut(&id) {
            device.status = status;
        }
    }

    /// Renames a known device.  Returns `false` for an unknown id.
    pub fn rename(&mut self, id: DeviceId, name: &str) -> bool {
        match self.devices.get_mut(&id) {
            Some(device) => {
                device.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Records that the device was seen alive at `at`.
    pub fn touch(&mut self, id: DeviceId, at: DateTime<Utc>) {
        if let Some(device) = self.devices.get_mut(&id) {
            device.last_seen = at;
        }
    }

    /// Display name of `id`, or `"Unknown"` when the id is not registered.
    pub fn name_of(&self, id: DeviceId) -> String {
        self.devices
            .get(&id)
            .map(|device| device.name.clone())
            .unwrap_or_else(|| UNKNOWN_DEVICE_NAME.to_string())
    }

    fn find_by_mac(&self, mac: &str) -> Option<&Device> {
        if mac.is_empty() {
            return None;
        }
        self.devices.values().find(|device| device.mac == mac)
    }
}
