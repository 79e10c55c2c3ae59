//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the hub's TOML settings from the
//! platform-appropriate directory (or an explicit path), writes them back,
//! and falls back to defaults when no file exists yet.

pub mod config;
