//! Infrastructure layer for the hub.
//!
//! Contains the OS-facing adapters: the HTTP transport to the buzzers, the
//! discovery sweep and per-device sessions built on it, and file-system
//! storage for the configuration.
//!
//! **Dependency rule**: this layer may depend on `buzzer_core`, but MUST NOT
//! import anything from `application`.

pub mod network;
pub mod storage;
