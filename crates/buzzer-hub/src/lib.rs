//! QuizBuzzer hub library.
//!
//! - [`infrastructure`]: HTTP transport to the buzzers, the subnet sweep,
//!   per-device sessions with their monitor loops, and the config file.
//! - [`application`]: the device registry and the [`BuzzerManager`] facade
//!   that the `buzzer-hub` binary and the integration tests drive.
//!
//! [`BuzzerManager`]: application::manage_buzzers::BuzzerManager

pub mod application;
pub mod infrastructure;
