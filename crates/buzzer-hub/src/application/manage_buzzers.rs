//! ManageBuzzers use case: the registry owner and the facade callers use.
//!
//! [`BuzzerManager`] ties the other parts together:
//!
//! - It asks a [`DeviceScanner`] for devices and merges the results into the
//!   [`DeviceRegistry`].
//! - It resolves device ids to snapshots and hands them to the
//!   [`CommunicationService`] for connect, disconnect, commands and renames.
//! - It runs an *event pump*: a background task that reads every
//!   [`CommunicationEvent`], applies it to the registry, and republishes it
//!   as a [`BuzzerEvent`] on a broadcast channel.
//!
//! # Event translation
//!
//! | Communication event                        | Domain event           |
//! |--------------------------------------------|------------------------|
//! | `MessageReceived` containing "press"       | `Pressed`              |
//! | `MessageReceived` (anything else)          | `Released`             |
//! | `StatusChanged` to `Connected`             | `Connected`            |
//! | `StatusChanged` to any other status        | `Disconnected`         |
//!
//! A status change is written to the registry before the domain event is
//! published, and the event carries the device name the registry holds at
//! that moment (`"Unknown"` for ids it does not know).
//!
//! # Why booleans? (for beginners)
//!
//! Every operation on the manager reports plain success or failure.  The
//! reason for a failure is logged where it happens (in the communication
//! layer), and the observable consequences (status changes) arrive as
//! events.  Callers such as a quiz UI only need to know whether to retry.

use std::sync::Arc;

use buzzer_core::{classify_message, BuzzerEvent, BuzzerEventKind, Device, DeviceId, DeviceStatus};
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::device_registry::DeviceRegistry;
use crate::infrastructure::network::communication::{CommunicationEvent, CommunicationService};
use crate::infrastructure::network::discovery::DeviceScanner;

/// Default capacity of the domain event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Registry owner and entry point for discovery, sessions and events.
pub struct BuzzerManager {
    scanner: Arc<dyn DeviceScanner>,
    communication: Arc<CommunicationService>,
    registry: Arc<Mutex<DeviceRegistry>>,
    events: broadcast::Sender<BuzzerEvent>,
    pump: JoinHandle<()>,
}

impl BuzzerManager {
    /// Creates the manager and starts its event pump.
    ///
    /// `communication_events` is the receiver returned by
    /// [`CommunicationService::new`].  Must be called from within a Tokio
    /// runtime.
    pub fn new(
        scanner: Arc<dyn DeviceScanner>,
        communication: CommunicationService,
        communication_events: mpsc::Receiver<CommunicationEvent>,
        event_capacity: usize,
    ) -> Self {
        let registry = Arc::new(Mutex::new(DeviceRegistry::new()));
        let (events, _) = broadcast::channel(event_capacity.max(1));
        let pump = tokio::spawn(pump_events(
            communication_events,
            Arc::clone(&registry),
            events.clone(),
        ));

        Self {
            scanner,
            communication: Arc::new(communication),
            registry,
            events,
            pump,
        }
    }

    /// Subscribes to domain events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<BuzzerEvent> {
        self.events.subscribe()
    }

    /// The session layer, e.g. for an inbound listener that reports messages.
    pub fn communication(&self) -> &CommunicationService {
        &self.communication
    }

    /// Runs a discovery sweep and merges the results into the registry.
    ///
    /// Returns every device found by this sweep.  A device that was already
    /// registered is returned as the registry holds it, so its id stays
    /// stable across sweeps.
    pub async fn discover(&self, name_filter: &str) -> Vec<Device> {
        let found = self.scanner.discover(name_filter).await;

        let mut registry = self.registry.lock().await;
        let before = registry.len();
        let batch: Vec<Device> = found.into_iter().map(|device| registry.merge(device)).collect();
        info!(
            "discovery returned {} device(s), {} new; {} known in total",
            batch.len(),
            registry.len() - before,
            registry.len()
        );
        batch
    }

    /// Connects to a registered device.
    ///
    /// Returns `false` without any network traffic for an unknown id.
    pub async fn connect(&self, id: DeviceId) -> bool {
        let device = {
            let mut registry = self.registry.lock().await;
            let Some(device) = registry.get(id).cloned() else {
                warn!("connect requested for unknown device {id}");
                return false;
            };
            registry.set_status(id, DeviceStatus::Connecting);
            device
        };

        let connected = self.communication.connect(&device).await.is_ok();
        self.sync_status(id).await;
        connected
    }

    /// Ends the session with a device.  Safe for unknown or idle devices.
    pub async fn disconnect(&self, id: DeviceId) {
        self.registry
            .lock()
            .await
            .set_status(id, DeviceStatus::Disconnected);
        self.communication.disconnect(id).await;
    }

    /// Sends a command to a connected device.
    pub async fn send_message(&self, id: DeviceId, action: &str) -> bool {
        let Some(device) = self.get(id).await else {
            debug!("command {action:?} for unknown device {id} dropped");
            return false;
        };
        self.communication.send_message(&device, action).await.is_ok()
    }

    /// Renames a connected device and, once the device accepts, the registry
    /// record.
    pub async fn set_name(&self, id: DeviceId, new_name: &str) -> bool {
        let Some(device) = self.get(id).await else {
            debug!("rename for unknown device {id} dropped");
            return false;
        };
        if self.communication.set_name(&device, new_name).await.is_err() {
            return false;
        }
        self.registry.lock().await.rename(id, new_name)
    }

    /// Snapshot of every registered device.
    pub async fn get_all(&self) -> Vec<Device> {
        self.registry.lock().await.all()
    }

    /// Snapshot of one registered device.
    pub async fn get(&self, id: DeviceId) -> Option<Device> {
        self.registry.lock().await.get(id).cloned()
    }

    /// Cancels every monitor loop and stops the event pump.
    pub async fn shutdown(&self) {
        self.communication.shutdown().await;
        self.pump.abort();
        info!("buzzer manager stopped");
    }

    /// Copies the session layer's tracked status into the registry.
    async fn sync_status(&self, id: DeviceId) {
        if let Some(status) = self.communication.status_of(id).await {
            self.registry.lock().await.set_status(id, status);
        }
    }
}

impl Drop for BuzzerManager {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

// ── Event pump ────────────────────────────────────────────────────────────────

/// Applies communication events to the registry and republishes them.
///
/// Ends when every sender of the communication channel is gone.
async fn pump_events(
    mut rx: mpsc::Receiver<CommunicationEvent>,
    registry: Arc<Mutex<DeviceRegistry>>,
    events: broadcast::Sender<BuzzerEvent>,
) {
    while let Some(event) = rx.recv().await {
        let domain_event = {
            let mut registry = registry.lock().await;
            translate(&mut registry, event)
        };

        trace!(
            "{:?} event for {} ({})",
            domain_event.kind,
            domain_event.device_name,
            domain_event.device_id
        );
        if events.send(domain_event).is_err() {
            trace!("no subscriber for domain events");
        }
    }
    debug!("event pump stopped");
}

/// Applies one communication event to `registry` and builds its domain event.
fn translate(registry: &mut DeviceRegistry, event: CommunicationEvent) -> BuzzerEvent {
    match event {
        CommunicationEvent::MessageReceived { device_id, message } => {
            let kind = classify_message(&message);
            BuzzerEvent::new(device_id, registry.name_of(device_id), kind, Some(message))
        }
        CommunicationEvent::StatusChanged {
            device_id, current, ..
        } => {
            registry.set_status(device_id, current);
            let kind = if current == DeviceStatus::Connected {
                registry.touch(device_id, Utc::now());
                BuzzerEventKind::Connected
            } else {
                BuzzerEventKind::Disconnected
            };
            BuzzerEvent::new(device_id, registry.name_of(device_id), kind, None)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
