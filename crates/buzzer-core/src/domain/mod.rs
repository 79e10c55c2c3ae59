//! Domain entities for QuizBuzzer.
//!
//! This module contains pure data and rules with no infrastructure
//! dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! The innermost layer of the application holds the concepts that make the
//! system what it is: here, a buzzer device and the events observers receive
//! about it.  Domain code never opens a socket or reads a file, so it can be
//! compiled and tested on any platform without any external setup.
//!
//! Outer layers (the hub's application and infrastructure modules) depend on
//! these types; the domain never depends on them.

/// The device record and its connectivity status.
pub mod device;

/// Domain events published to observers.
pub mod event;

/// The address range swept by discovery.
pub mod network;
