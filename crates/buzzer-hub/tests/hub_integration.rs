//! End-to-end tests of the hub through its public API.
//!
//! # Purpose
//!
//! These tests wire the real [`DiscoveryService`], [`CommunicationService`]
//! and [`BuzzerManager`] together the way the `buzzer-hub` binary does, with
//! one difference: the HTTP transport is replaced by the scripted
//! [`MockTransport`], so every test decides what each buzzer answers and
//! can count the requests that were (or were not) made.
//!
//! The clock is paused (`start_paused = true`), so the 2-second monitor
//! interval elapses instantly whenever every task is idle.
//!
//! # Scenario used throughout
//!
//! ```text
//! 10.0.0.7  GET /status → {status: "ok", device: "QuizBuzzer1", mac: "AA:11:BB:22:CC:33"}
//! every other host of 10.0.0.0/24 → unreachable
//! ```

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use buzzer_core::{BuzzerEvent, BuzzerEventKind, DeviceId, DeviceStatus, NetworkPrefix};
use buzzer_hub::application::manage_buzzers::{BuzzerManager, DEFAULT_EVENT_CAPACITY};
use buzzer_hub::infrastructure::network::communication::{CommunicationService, SessionSettings};
use buzzer_hub::infrastructure::network::discovery::{
    DiscoveryService, DiscoverySettings, DEFAULT_NAME_FILTER, DEFAULT_PROBE_TIMEOUT,
};
use buzzer_hub::infrastructure::network::mock::{AckReply, MockTransport, StatusReply};
use buzzer_hub::infrastructure::network::transport::BuzzerTransport;
use tokio::sync::broadcast;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn buzzer_ip() -> IpAddr {
    "10.0.0.7".parse().unwrap()
}

/// Builds the full stack over a transport where `10.0.0.7` is a healthy
/// buzzer.
fn build_hub() -> (BuzzerManager, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    transport.set_status(buzzer_ip(), StatusReply::healthy("QuizBuzzer1", "AA:11:BB:22:CC:33"));

    let shared: Arc<dyn BuzzerTransport> = transport.clone();
    let discovery = DiscoveryService::new(
        Arc::clone(&shared),
        DiscoverySettings {
            network_prefix: NetworkPrefix::new(10, 0, 0),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        },
    );
    let (communication, rx) = CommunicationService::new(shared, SessionSettings::default());
    let manager = BuzzerManager::new(Arc::new(discovery), communication, rx, DEFAULT_EVENT_CAPACITY);
    (manager, transport)
}

async fn next_event(events: &mut broadcast::Receiver<BuzzerEvent>) -> BuzzerEvent {
    tokio::time::timeout(Duration::from_secs(30), events.recv())
        .await
        .expect("an event should arrive")
        .expect("event channel open")
}

/// Discovers and connects the scenario buzzer; returns its id once the
/// Connected event has been observed.
async fn discover_and_connect(
    manager: &BuzzerManager,
    events: &mut broadcast::Receiver<BuzzerEvent>,
) -> DeviceId {
    let id = manager.discover(DEFAULT_NAME_FILTER).await[0].id;
    assert!(manager.connect(id).await, "connect should succeed");
    assert_eq!(next_event(events).await.kind, BuzzerEventKind::Connected);
    id
}

// ── Discovery ─────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_discovery_finds_scenario_buzzer_with_normalized_fields() {
    // Arrange
    let (manager, transport) = build_hub();

    // Act
    let found = manager.discover(DEFAULT_NAME_FILTER).await;

    // Assert
    assert_eq!(found.len(), 1);
    let device = &found[0];
    assert_eq!(device.name, "QuizBuzzer1");
    assert_eq!(device.ip, buzzer_ip());
    assert_eq!(device.mac, "aa-11-bb-22-cc-33");
    assert_eq!(device.status, DeviceStatus::Disconnected);
    assert_eq!(transport.total_status_calls(), 254);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_discovery_keeps_one_registry_entry() {
    let (manager, _transport) = build_hub();

    let first = manager.discover(DEFAULT_NAME_FILTER).await;
    let second = manager.discover(DEFAULT_NAME_FILTER).await;

    assert_eq!(manager.get_all().await.len(), 1);
    assert_eq!(first[0].id, second[0].id);
}

#[tokio::test(start_paused = true)]
async fn test_rediscovery_after_address_change_reconnects_at_new_address() {
    // Arrange: the buzzer is found at .7, then its lease moves it to .9.
    let (manager, transport) = build_hub();
    let mut events = manager.subscribe();
    let id = manager.discover(DEFAULT_NAME_FILTER).await[0].id;
    let new_ip: IpAddr = "10.0.0.9".parse().unwrap();
    transport.set_status(buzzer_ip(), StatusReply::Unreachable);
    transport.set_status(new_ip, StatusReply::healthy("QuizBuzzer1", "AA:11:BB:22:CC:33"));

    // Act
    let found = manager.discover(DEFAULT_NAME_FILTER).await;
    let connected = manager.connect(id).await;

    // Assert
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, id);
    assert_eq!(found[0].ip, new_ip);
    assert_eq!(manager.get_all().await.len(), 1);
    assert!(connected);
    assert_eq!(next_event(&mut events).await.kind, BuzzerEventKind::Connected);
    assert_eq!(manager.get(id).await.unwrap().ip, new_ip);
}

#[tokio::test(start_paused = true)]
async fn test_discovery_with_non_matching_filter_registers_nothing() {
    let (manager, _transport) = build_hub();

    let found = manager.discover("Printer").await;

    assert!(found.is_empty());
    assert!(manager.get_all().await.is_empty());
}

// ── Sessions ──────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_connect_publishes_connected_event_with_device_name() {
    // Arrange
    let (manager, _transport) = build_hub();
    let mut events = manager.subscribe();
    let id = manager.discover(DEFAULT_NAME_FILTER).await[0].id;

    // Act
    let connected = manager.connect(id).await;

    // Assert
    assert!(connected);
    let event = next_event(&mut events).await;
    assert_eq!(event.kind, BuzzerEventKind::Connected);
    assert_eq!(event.device_id, id);
    assert_eq!(event.device_name, "QuizBuzzer1");
    assert_eq!(manager.get(id).await.unwrap().status, DeviceStatus::Connected);
    assert!(manager.communication().is_monitoring(id).await);
}

#[tokio::test(start_paused = true)]
async fn test_monitor_http_500_marks_error_and_publishes_disconnected() {
    // Arrange
    let (manager, transport) = build_hub();
    let mut events = manager.subscribe();
    let id = discover_and_connect(&manager, &mut events).await;

    // Act: the next monitor poll gets an HTTP 500.
    transport.set_status(buzzer_ip(), StatusReply::HttpError(500));

    // Assert: no explicit disconnect, yet the drop is reported.
    let event = next_event(&mut events).await;
    assert_eq!(event.kind, BuzzerEventKind::Disconnected);
    assert_eq!(event.device_name, "QuizBuzzer1");
    assert_eq!(manager.get(id).await.unwrap().status, DeviceStatus::Error);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_stops_probing_the_device() {
    // Arrange
    let (manager, transport) = build_hub();
    let mut events = manager.subscribe();
    let id = discover_and_connect(&manager, &mut events).await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    // Act
    manager.disconnect(id).await;
    let probes_at_disconnect = transport.status_calls(buzzer_ip());
    tokio::time::sleep(Duration::from_secs(30)).await;

    // Assert
    assert_eq!(transport.status_calls(buzzer_ip()), probes_at_disconnect);
    assert_eq!(next_event(&mut events).await.kind, BuzzerEventKind::Disconnected);
    assert_eq!(manager.get(id).await.unwrap().status, DeviceStatus::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_after_drop_restores_connected() {
    // Arrange: connect, then let the device drop.
    let (manager, transport) = build_hub();
    let mut events = manager.subscribe();
    let id = discover_and_connect(&manager, &mut events).await;
    transport.set_status(buzzer_ip(), StatusReply::Unreachable);
    assert_eq!(next_event(&mut events).await.kind, BuzzerEventKind::Disconnected);

    // Act: the device comes back.
    transport.set_status(buzzer_ip(), StatusReply::healthy("QuizBuzzer1", "AA:11:BB:22:CC:33"));

    // Assert: the running monitor notices by itself.
    assert_eq!(next_event(&mut events).await.kind, BuzzerEventKind::Connected);
    assert_eq!(manager.get(id).await.unwrap().status, DeviceStatus::Connected);
}

// ── Commands ──────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_debut_quiz_acknowledged_returns_true() {
    let (manager, transport) = build_hub();
    transport.set_command_reply(buzzer_ip(), AckReply::Status("received".to_string()));
    let mut events = manager.subscribe();
    let id = discover_and_connect(&manager, &mut events).await;

    assert!(manager.send_message(id, "DebutQuiz").await);
    assert_eq!(transport.sent_commands()[0].1.action, "DebutQuiz");
}

#[tokio::test(start_paused = true)]
async fn test_debut_quiz_rejected_returns_false_and_keeps_status() {
    // Arrange
    let (manager, transport) = build_hub();
    transport.set_command_reply(buzzer_ip(), AckReply::Status("rejected".to_string()));
    let mut events = manager.subscribe();
    let id = discover_and_connect(&manager, &mut events).await;

    // Act
    let sent = manager.send_message(id, "DebutQuiz").await;

    // Assert
    assert!(!sent);
    assert_eq!(manager.get(id).await.unwrap().status, DeviceStatus::Connected);
    assert!(matches!(events.try_recv(), Err(broadcast::error::TryRecvError::Empty)));
}

#[tokio::test(start_paused = true)]
async fn test_command_to_unconnected_device_makes_no_network_call() {
    // Arrange
    let (manager, transport) = build_hub();
    transport.set_command_reply(buzzer_ip(), AckReply::Status("received".to_string()));
    let id = manager.discover(DEFAULT_NAME_FILTER).await[0].id;

    // Act
    let sent = manager.send_message(id, "TestCommunicationBluetooth").await;

    // Assert
    assert!(!sent);
    assert_eq!(transport.command_calls(buzzer_ip()), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rename_updates_registry_and_later_event_names() {
    // Arrange
    let (manager, transport) = build_hub();
    transport.set_name_reply(buzzer_ip(), AckReply::Status("ok".to_string()));
    let mut events = manager.subscribe();
    let id = discover_and_connect(&manager, &mut events).await;

    // Act
    assert!(manager.set_name(id, "QuizRed").await);
    manager.communication().report_message(id, "button_press").await;

    // Assert
    assert_eq!(manager.get(id).await.unwrap().name, "QuizRed");
    let event = next_event(&mut events).await;
    assert_eq!(event.kind, BuzzerEventKind::Pressed);
    assert_eq!(event.device_name, "QuizRed");
}

// ── Shutdown ──────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_every_monitor() {
    let (manager, transport) = build_hub();
    let mut events = manager.subscribe();
    discover_and_connect(&manager, &mut events).await;

    manager.shutdown().await;
    let probes = transport.total_status_calls();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(transport.total_status_calls(), probes);
}
