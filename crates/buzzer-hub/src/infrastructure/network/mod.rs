//! Network infrastructure for the hub.
//!
//! # Sub-modules
//!
//! - **`transport`** – The [`transport::BuzzerTransport`] trait: one method per
//!   control endpoint.  The production implementation speaks HTTP through
//!   `reqwest`; everything above it only sees typed bodies and errors.
//!
//! - **`mock`** – A scripted in-memory transport with per-address call
//!   counters, used by unit and integration tests.
//!
//! - **`discovery`** – Sweeps a /24 network by probing every host's
//!   `/status` endpoint in parallel and returns the devices that answered.
//!
//! - **`communication`** – The per-device session state machine: connect,
//!   disconnect, commands, renames, and the background monitor loop that
//!   re-probes each connected device every two seconds.

pub mod communication;
pub mod discovery;
pub mod mock;
pub mod transport;
