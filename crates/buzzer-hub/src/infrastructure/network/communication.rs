//! Per-device sessions: connect, disconnect, commands, renames, and health
//! monitoring.
//!
//! The [`CommunicationService`] tracks a connectivity status per device id
//! and runs one background *monitor loop* for every connected device.  It
//! reports what happens through a channel of [`CommunicationEvent`]s, which
//! is the only way it signals anything to the rest of the hub.
//!
//! # Session state machine
//!
//! ```text
//! connect(): probe /status ──"ok"──► Connected ──► monitor loop started
//!                    │                               │  every 2 s: probe /status
//!                    └── anything else ──► Error     │   ok   → Connected
//!                                                    │   fail → Error
//! disconnect(): cancel monitor, forget status ──► Disconnected
//! ```
//!
//! Commands (`/message`) and renames (`/set-name`) are only sent while the
//! tracked status is `Connected`; otherwise they fail locally without any
//! network traffic.  Their failures never change the tracked status: only
//! `/status` probes move a device between `Connected` and `Error`.
//!
//! # Cancellation (for beginners)
//!
//! Each monitor loop is a Tokio task paired with a one-shot cancellation
//! channel, stored together as a `MonitorHandle` keyed by device id.  The
//! loop waits on the cancellation receiver *and* on its timer / probe at the
//! same time (`tokio::select!`), so a disconnect interrupts it whether it is
//! sleeping or waiting for a reply.  The handle is created at connect time,
//! consumed by exactly one task, and removed exactly once, at disconnect.
//! A second connect for a device that is already monitored at the same
//! address does not start a second loop; one at a new address replaces it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use buzzer_core::{CommandRequest, Device, DeviceId, DeviceStatus, SetNameRequest};
use thiserror::Error;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::transport::{BuzzerTransport, TransportError, DEFAULT_REQUEST_TIMEOUT};

/// Pause between two health probes of a connected device.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(2);

/// Capacity of the communication event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Runtime settings of device sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Timeout of connect probes, monitor probes, commands and renames.
    pub request_timeout: Duration,
    pub monitor_interval: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
        }
    }
}

/// Raw signals produced by the communication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommunicationEvent {
    /// A device sent a message to the hub.
    MessageReceived { device_id: DeviceId, message: String },
    /// The tracked status of a device changed.
    StatusChanged {
        device_id: DeviceId,
        previous: DeviceStatus,
        current: DeviceStatus,
    },
}

/// Why a session operation failed.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation requires a connected device.
    #[error("device {0} is not connected")]
    NotConnected(DeviceId),
    /// `/status` answered, but not with `"ok"`.
    #[error("device reported status {status:?}")]
    Unhealthy { status: Option<String> },
    /// The device answered a command or rename without acknowledging it.
    #[error("device did not acknowledge the request (status {status:?})")]
    Rejected { status: Option<String> },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Cancellation context of one monitor loop.
struct MonitorHandle {
    addr: SocketAddr,
    cancel: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Stops the loop; no probe is started after this returns.
    fn cancel(self) {
        let _ = self.cancel.send(());
        self.task.abort();
    }

    fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

type StatusTable = Arc<RwLock<HashMap<DeviceId, DeviceStatus>>>;

/// Session layer over a [`BuzzerTransport`].
pub struct CommunicationService {
    transport: Arc<dyn BuzzerTransport>,
    settings: SessionSettings,
    statuses: StatusTable,
    monitors: Mutex<HashMap<DeviceId, MonitorHandle>>,
    event_tx: mpsc::Sender<CommunicationEvent>,
}

impl CommunicationService {
    /// Creates the service and returns it together with its event receiver.
    pub fn new(
        transport: Arc<dyn BuzzerTransport>,
        settings: SessionSettings,
    ) -> (Self, mpsc::Receiver<CommunicationEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let service = Self {
            transport,
            settings,
            statuses: Arc::new(RwLock::new(HashMap::new())),
            monitors: Mutex::new(HashMap::new()),
            event_tx: tx,
        };
        (service, rx)
    }

    /// Opens a session with `device` and starts monitoring it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] if the probe gets no usable reply
    /// and [`SessionError::Unhealthy`] if the device does not answer `"ok"`.
    /// In both cases the tracked status becomes [`DeviceStatus::Error`].
    pub async fn connect(&self, device: &Device) -> Result<(), SessionError> {
        let addr = device.socket_addr();
        match probe(self.transport.as_ref(), addr, self.settings.request_timeout).await {
            Ok(()) => {
                self.statuses
                    .write()
                    .await
                    .insert(device.id, DeviceStatus::Connected);
                info!("connected to {} at {addr}", device.name);
                self.emit(CommunicationEvent::StatusChanged {
                    device_id: device.id,
                    previous: DeviceStatus::Disconnected,
                    current: DeviceStatus::Connected,
                })
                .await;
                self.start_monitor(device).await;
                Ok(())
            }
            Err(e) => {
                warn!("failed to connect to {} at {addr}: {e}", device.name);
                self.statuses
                    .write()
                    .await
                    .insert(device.id, DeviceStatus::Error);
                self.emit(CommunicationEvent::StatusChanged {
                    device_id: device.id,
                    previous: DeviceStatus::Connecting,
                    current: DeviceStatus::Error,
                })
                .await;
                Err(e)
            }
        }
    }

    /// Ends the session with `device_id`.
    ///
    /// Safe to call for a device that has no session.
    pub async fn disconnect(&self, device_id: DeviceId) {
        if let Some(handle) = self.monitors.lock().await.remove(&device_id) {
            handle.cancel();
        }
        let previous = self.statuses.write().await.remove(&device_id);
        info!("disconnected {device_id}");

        self.emit(CommunicationEvent::StatusChanged {
            device_id,
            previous: previous.unwrap_or(DeviceStatus::Disconnected),
            current: DeviceStatus::Disconnected,
        })
        .await;
    }

    /// Sends a `{type: "command", action}` message to a connected device.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`] without any request when the device is
    /// not connected, [`SessionError::Rejected`] unless the device answers
    /// `"received"`, or [`SessionError::Transport`].
    pub async fn send_message(&self, device: &Device, action: &str) -> Result<(), SessionError> {
        self.ensure_connected(device.id).await?;

        let request = CommandRequest::command(action);
        let reply = match self.transport.post_command(device.socket_addr(), &request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("[{}] command {action:?} failed: {e}", device.name);
                return Err(e.into());
            }
        };

        if reply.is_received() {
            debug!("[{}] command {action:?} acknowledged", device.name);
            Ok(())
        } else {
            warn!("[{}] command {action:?} not acknowledged: {:?}", device.name, reply.status);
            Err(SessionError::Rejected {
                status: reply.status,
            })
        }
    }

    /// Asks a connected device to rename itself.
    ///
    /// On success the caller owns the device record and applies the new name.
    ///
    /// # Errors
    ///
    /// Same gate and failure modes as [`Self::send_message`]; the device must
    /// answer `"ok"`.
    pub async fn set_name(&self, device: &Device, new_name: &str) -> Result<(), SessionError> {
        self.ensure_connected(device.id).await?;

        let request = SetNameRequest {
            name: new_name.to_string(),
        };
        let reply = match self.transport.post_set_name(device.socket_addr(), &request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("[{}] rename to {new_name:?} failed: {e}", device.name);
                return Err(e.into());
            }
        };

        if reply.is_ok() {
            info!("[{}] renamed {} -> {new_name}", device.name, device.mac);
            Ok(())
        } else {
            warn!("[{}] rename to {new_name:?} refused: {:?}", device.name, reply.status);
            Err(SessionError::Rejected {
                status: reply.status,
            })
        }
    }

    /// Reports a message received from a device (e.g. a button press pushed
    /// by an inbound listener).
    pub async fn report_message(&self, device_id: DeviceId, message: impl Into<String>) {
        self.emit(CommunicationEvent::MessageReceived {
            device_id,
            message: message.into(),
        })
        .await;
    }

    /// Tracked status of `device_id`, `None` when there is no session.
    pub async fn status_of(&self, device_id: DeviceId) -> Option<DeviceStatus> {
        self.statuses.read().await.get(&device_id).copied()
    }

    /// `true` while a monitor loop is registered for `device_id`.
    pub async fn is_monitoring(&self, device_id: DeviceId) -> bool {
        self.monitors.lock().await.contains_key(&device_id)
    }

    /// Cancels every monitor loop and forgets every tracked status.
    ///
    /// No events are emitted.
    pub async fn shutdown(&self) {
        let handles: Vec<MonitorHandle> = self.monitors.lock().await.drain().map(|(_, h)| h).collect();
        let count = handles.len();
        for handle in handles {
            handle.cancel();
        }
        self.statuses.write().await.clear();
        info!("communication service stopped ({count} monitor(s) cancelled)");
    }

    async fn ensure_connected(&self, device_id: DeviceId) -> Result<(), SessionError> {
        match self.status_of(device_id).await {
            Some(DeviceStatus::Connected) => Ok(()),
            _ => Err(SessionError::NotConnected(device_id)),
        }
    }

    async fn start_monitor(&self, device: &Device) {
        let addr = device.socket_addr();
        let mut monitors = self.monitors.lock().await;
        if let Some(running) = monitors.remove(&device.id) {
            if !running.is_finished() && running.addr == addr {
                debug!("monitor already running for {}; keeping it", device.name);
                monitors.insert(device.id, running);
                return;
            }
            if running.addr != addr {
                info!("{} moved from {} to {addr}; restarting its monitor", device.name, running.addr);
            }
            running.cancel();
        }

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let task = self.spawn_monitor(device, cancel_rx);
        monitors.insert(
            device.id,
            MonitorHandle {
                addr,
                cancel: cancel_tx,
                task,
            },
        );
    }

    fn spawn_monitor(&self, device: &Device, cancel: oneshot::Receiver<()>) -> JoinHandle<()> {
        let monitor = Monitor {
            device_id: device.id,
            device_name: device.name.clone(),
            addr: device.socket_addr(),
            transport: Arc::clone(&self.transport),
            statuses: Arc::clone(&self.statuses),
            event_tx: self.event_tx.clone(),
            settings: self.settings.clone(),
        };
        tokio::spawn(monitor.run(cancel))
    }

    async fn emit(&self, event: CommunicationEvent) {
        emit(&self.event_tx, event).await;
    }
}

impl Drop for CommunicationService {
    fn drop(&mut self) {
        for (_, handle) in self.monitors.get_mut().drain() {
            handle.cancel();
        }
    }
}

// ── Monitor loop ──────────────────────────────────────────────────────────────

/// Everything one monitor loop needs, moved into its task.
struct Monitor {
    device_id: DeviceId,
    device_name: String,
    addr: SocketAddr,
    transport: Arc<dyn BuzzerTransport>,
    statuses: StatusTable,
    event_tx: mpsc::Sender<CommunicationEvent>,
    settings: SessionSettings,
}

impl Monitor {
    async fn run(self, mut cancel: oneshot::Receiver<()>) {
        debug!("monitoring {} every {:?}", self.device_name, self.settings.monitor_interval);

        loop {
            tokio::select! {
                _ = &mut cancel => break,
                _ = tokio::time::sleep(self.settings.monitor_interval) => {}
            }

            let outcome = tokio::select! {
                _ = &mut cancel => break,
                outcome = probe(self.transport.as_ref(), self.addr, self.settings.request_timeout) => outcome,
            };

            if !self.apply(outcome, &mut cancel).await {
                break;
            }
        }

        debug!("monitor for {} stopped", self.device_name);
    }

    /// Records a probe outcome; returns `false` when the session is gone.
    ///
    /// Only transitions are reported: `Connected → Error` when the device
    /// drops and `Error → Connected` when it comes back.
    async fn apply(
        &self,
        outcome: Result<(), SessionError>,
        cancel: &mut oneshot::Receiver<()>,
    ) -> bool {
        let current = match &outcome {
            Ok(()) => DeviceStatus::Connected,
            Err(_) => DeviceStatus::Error,
        };

        let previous = {
            let mut statuses = self.statuses.write().await;
            if !matches!(cancel.try_recv(), Err(TryRecvError::Empty)) {
                return false;
            }
            let Some(previous) = statuses.get(&self.device_id).copied() else {
                return false;
            };
            statuses.insert(self.device_id, current);
            previous
        };

        if previous == current {
            trace!("{} still {current}", self.device_name);
            return true;
        }

        match outcome {
            Err(e) => warn!("{} dropped: {e}", self.device_name),
            Ok(()) => info!("{} is reachable again", self.device_name),
        }
        emit(
            &self.event_tx,
            CommunicationEvent::StatusChanged {
                device_id: self.device_id,
                previous,
                current,
            },
        )
        .await;
        true
    }
}

/// One `/status` health check.
async fn probe(
    transport: &dyn BuzzerTransport,
    addr: SocketAddr,
    timeout: Duration,
) -> Result<(), SessionError> {
    let reply = transport.get_status(addr, timeout).await?;
    if reply.is_ok() {
        Ok(())
    } else {
        Err(SessionError::Unhealthy {
            status: reply.status,
        })
    }
}

async fn emit(tx: &mpsc::Sender<CommunicationEvent>, event: CommunicationEvent) {
    if tx.send(event).await.is_err() {
        trace!("no listener for communication events");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
