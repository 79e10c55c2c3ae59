//! Protocol module containing the JSON bodies of the buzzer control endpoints.

pub mod messages;

pub use messages::*;
