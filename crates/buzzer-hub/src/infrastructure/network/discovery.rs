//! Subnet sweep discovery of buzzers.
//!
//! Buzzers do not announce themselves, so the hub goes looking for them: it
//! sends a `GET /status` to every host address of a /24 network at once and
//! keeps the addresses that answer like a healthy buzzer.
//!
//! For every host `.1` through `.254` of the configured prefix, a probe:
//!
//! 1. Requests `http://<host>:80/status` with a short (2 s) timeout.
//! 2. Decodes the JSON reply and checks that `status == "ok"`.
//! 3. Builds a [`Device`] from the reply: fresh id, status `Disconnected`,
//!    normalized hardware address, `last_seen` = now.
//!
//! # Why one task per address? (for beginners)
//!
//! Most of the 254 addresses have nothing behind them, so most probes end by
//! timing out.  Done one after another, a sweep would take over eight
//! minutes; done concurrently it takes about one timeout.  Each probe runs as
//! its own Tokio task inside a [`JoinSet`] and returns its own result, so no
//! probe ever touches another probe's output and no lock is needed.  The
//! results are merged after every task has finished.
//!
//! # Failures are absences
//!
//! A timeout, a refused connection, an HTTP error, or a body that is not the
//! expected JSON all mean the same thing here: "no buzzer at this address".
//! They are logged at `trace` level and never reported as errors.  There are
//! no retries; an address that fails once is absent for that sweep.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use buzzer_core::{Device, NetworkPrefix, DEFAULT_PORT};
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

use super::transport::BuzzerTransport;

/// Default name filter: only devices whose name starts with this are kept.
pub const DEFAULT_NAME_FILTER: &str = "Quiz";

/// Timeout of a single discovery probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Runtime settings of the discovery sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySettings {
    pub network_prefix: NetworkPrefix,
    pub probe_timeout: Duration,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            network_prefix: NetworkPrefix::default(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// Something that can find devices on the network.
///
/// The manager depends on this trait rather than on [`DiscoveryService`], so
/// its tests can hand it a fixed list of devices.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceScanner: Send + Sync {
    /// Devices whose name starts with `name_prefix`, case-insensitively.
    async fn discover(&self, name_prefix: &str) -> Vec<Device>;

    /// Every healthy device that answered, whatever its name.
    async fn scan_network(&self) -> Vec<Device>;
}

/// Sweeps a /24 network through a [`BuzzerTransport`].
pub struct DiscoveryService {
    transport: Arc<dyn BuzzerTransport>,
    settings: DiscoverySettings,
}

impl DiscoveryService {
    pub fn new(transport: Arc<dyn BuzzerTransport>, settings: DiscoverySettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn settings(&self) -> &DiscoverySettings {
        &self.settings
    }
}

#[async_trait]
impl DeviceScanner for DiscoveryService {
    async fn discover(&self, name_prefix: &str) -> Vec<Device> {
        let found = self.scan_network().await;
        let total = found.len();
        let matching: Vec<Device> = found
            .into_iter()
            .filter(|device| device.name_matches(name_prefix))
            .collect();

        info!(
            "discovery on {}: {} device(s) matching {name_prefix:?} out of {total} responding",
            self.settings.network_prefix,
            matching.len()
        );
        matching
    }

    async fn scan_network(&self) -> Vec<Device> {
        let prefix = self.settings.network_prefix;
        debug!("sweeping {prefix}.1-254");

        let mut probes = JoinSet::new();
        for host in prefix.hosts() {
            let transport = Arc::clone(&self.transport);
            let timeout = self.settings.probe_timeout;
            probes.spawn(async move { probe_host(transport.as_ref(), host, timeout).await });
        }

        let mut devices = Vec::new();
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok(Some(device)) => devices.push(device),
                Ok(None) => {}
                Err(e) => warn!("discovery probe task failed: {e}"),
            }
        }
        devices
    }
}

/// Probes one host; `None` means "no buzzer here".
async fn probe_host(
    transport: &dyn BuzzerTransport,
    host: Ipv4Addr,
    timeout: Duration,
) -> Option<Device> {
    let ip = IpAddr::V4(host);
    let addr = SocketAddr::new(ip, DEFAULT_PORT);

    let reply = match transport.get_status(addr, timeout).await {
        Ok(reply) => reply,
        Err(e) => {
            trace!("no buzzer at {host}: {e}");
            return None;
        }
    };

    if !reply.is_ok() {
        debug!("{host} answered with status {:?}; skipping", reply.status);
        return None;
    }

    let name = reply
        .device
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("Buzzer {host}"));
    let device = Device::discovered(name, ip, reply.mac.as_deref());
    debug!("found {} at {host} ({})", device.name, device.mac);
    Some(device)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
