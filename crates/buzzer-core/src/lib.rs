//! # buzzer-core
//!
//! Shared library for QuizBuzzer containing the device record, the domain
//! event stream types, the subnet description used by discovery, and the
//! JSON bodies of the buzzer control protocol.
//!
//! It has zero dependencies on sockets, HTTP clients, or async runtimes, so
//! everything here can be unit-tested without a network.
//!
//! # Architecture overview (for beginners)
//!
//! A "buzzer" is a small networked device (a microcontroller with a button)
//! that exposes three HTTP endpoints: `/status`, `/message`, and `/set-name`.
//! The hub application sweeps the local network to find buzzers, connects to
//! them, watches their health, and sends them commands.
//!
//! This crate (`buzzer-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – What a device *is* (identity, address, status) and what
//!   observers are told about it (domain events).
//!
//! - **`protocol`** – What travels over the wire: the request and response
//!   bodies of each endpoint, and the acknowledgement strings that mean
//!   "success".

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `buzzer_core::Device` instead of `buzzer_core::domain::device::Device`.
pub use domain::device::{normalize_mac, Device, DeviceId, DeviceStatus, DEFAULT_PORT};
pub use domain::event::{classify_message, BuzzerEvent, BuzzerEventKind, UNKNOWN_DEVICE_NAME};
pub use domain::network::{NetworkPrefix, NetworkPrefixError};
pub use protocol::messages::{
    CommandRequest, CommandResponse, SetNameRequest, SetNameResponse, StatusResponse,
};
