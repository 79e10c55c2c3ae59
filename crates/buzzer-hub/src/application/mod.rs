//! Application layer use cases for the hub.
//!
//! # What is the "application" layer? (for beginners)
//!
//! The application layer sits between the domain types of `buzzer_core` and
//! the infrastructure adapters (HTTP transport, discovery sweep, sessions).
//! It orchestrates them to fulfil what a quiz host actually asks for: "find
//! the buzzers", "connect to that one", "tell it the quiz starts", and "let
//! me know when someone presses".
//!
//! # Sub-modules
//!
//! - **`device_registry`** – The in-memory map of every known buzzer.  Only
//!   named operations change a record; discovery never overwrites one.
//!
//! - **`manage_buzzers`** – The [`manage_buzzers::BuzzerManager`] facade:
//!   discovery merge, session delegation, and the pump that turns
//!   communication events into domain events.

pub mod device_registry;
pub mod manage_buzzers;
