//! Quiz buzzer hub, headless runner.
//!
//! Finds the buzzers on the local network, optionally connects to all of
//! them, and logs every domain event (connections, drops, presses) until
//! Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load HubConfig            -- file, then CLI / env overrides
//!  └─ HttpTransport
//!       ├─ DiscoveryService     -- subnet sweep
//!       └─ CommunicationService -- sessions + monitor loops
//!  └─ BuzzerManager             -- registry + event pump
//!       └─ event logger task    -- subscribes to domain events
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use buzzer_core::{BuzzerEvent, NetworkPrefix};
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use buzzer_hub::application::manage_buzzers::BuzzerManager;
use buzzer_hub::infrastructure::network::communication::{CommunicationService, SessionSettings};
use buzzer_hub::infrastructure::network::discovery::{DiscoveryService, DiscoverySettings};
use buzzer_hub::infrastructure::network::transport::{BuzzerTransport, HttpTransport};
use buzzer_hub::infrastructure::storage::config::{self, HubConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Discovers quiz buzzers on a /24 network and reports their events.
#[derive(Debug, Parser)]
#[command(
    name = "buzzer-hub",
    about = "Discovery and session hub for networked quiz buzzers",
    version
)]
struct Cli {
    /// Path of the TOML config file.
    ///
    /// Defaults to `config.toml` in the platform config directory; a missing
    /// file means "all defaults".
    #[arg(long, env = "QUIZBUZZER_CONFIG")]
    config: Option<PathBuf>,

    /// Network to sweep, as its first three octets (e.g. `192.168.1`).
    #[arg(long, env = "QUIZBUZZER_PREFIX")]
    prefix: Option<NetworkPrefix>,

    /// Only keep devices whose name starts with this, ignoring case.
    #[arg(long, env = "QUIZBUZZER_FILTER")]
    filter: Option<String>,

    /// Connect to every discovered device.
    #[arg(long)]
    connect: bool,
}

impl Cli {
    /// Loads the config file and applies the command-line overrides.
    fn load_config(&self) -> anyhow::Result<HubConfig> {
        let mut cfg = match &self.config {
            Some(path) => config::load_config_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => config::load_config().context("failed to load config")?,
        };

        if let Some(prefix) = self.prefix {
            cfg.discovery.network_prefix = prefix;
        }
        if let Some(filter) = &self.filter {
            cfg.discovery.name_filter = filter.clone();
        }
        Ok(cfg)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = cli.load_config()?;

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.hub.log_level)),
        )
        .init();

    let discovery_settings = DiscoverySettings::from(&cfg.discovery);
    let session_settings = SessionSettings::from(&cfg.session);

    // ── Wiring ────────────────────────────────────────────────────────────────
    let transport: Arc<dyn BuzzerTransport> = Arc::new(
        HttpTransport::new(session_settings.request_timeout)
            .context("failed to initialise HTTP transport")?,
    );
    let scanner = Arc::new(DiscoveryService::new(Arc::clone(&transport), discovery_settings));
    info!(
        "buzzer hub starting: network {}, probe timeout {:?}, filter {:?}",
        scanner.settings().network_prefix,
        scanner.settings().probe_timeout,
        cfg.discovery.name_filter
    );
    let (communication, communication_events) =
        CommunicationService::new(transport, session_settings);
    let manager = BuzzerManager::new(
        scanner,
        communication,
        communication_events,
        cfg.hub.event_capacity,
    );

    let logger = tokio::spawn(log_events(manager.subscribe()));

    // ── Discovery ─────────────────────────────────────────────────────────────
    let devices = manager.discover(&cfg.discovery.name_filter).await;
    if devices.is_empty() {
        warn!("no buzzers found");
    }
    for device in &devices {
        info!("  {} at {} ({}) id={}", device.name, device.ip, device.mac, device.id);
    }

    if cli.connect {
        for device in &devices {
            if !manager.connect(device.id).await {
                warn!("could not connect to {}", device.name);
            }
        }
    }

    // ── Run until Ctrl-C ──────────────────────────────────────────────────────
    info!("buzzer hub ready.  Press Ctrl-C to exit.");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("shutdown signal received");

    manager.shutdown().await;
    logger.abort();

    info!("buzzer hub stopped");
    Ok(())
}

/// Logs every domain event until the channel closes.
async fn log_events(mut events: broadcast::Receiver<BuzzerEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match &event.payload {
                Some(payload) => info!(
                    "[{}] {:?} ({payload}) at {}",
                    event.device_name, event.kind, event.timestamp
                ),
                None => info!("[{}] {:?} at {}", event.device_name, event.kind, event.timestamp),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("event logger fell behind; {skipped} event(s) skipped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
