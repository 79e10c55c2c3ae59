//! Request and response bodies of the buzzer control protocol.
//!
//! | Endpoint    | Method | Request body                | Success response          |
//! |-------------|--------|-----------------------------|---------------------------|
//! | `/status`   | GET    | none                        | `{status, device, ip, mac}` |
//! | `/message`  | POST   | `{type: "command", action}` | `{status: "received"}`    |
//! | `/set-name` | POST   | `{name}`                    | `{status: "ok"}`          |
//!
//! Response fields are all optional on the wire: a buzzer running older
//! firmware may omit any of them, and a missing `status` simply never equals
//! the expected acknowledgement.

use serde::{Deserialize, Serialize};

// ── Endpoint paths ────────────────────────────────────────────────────────────

pub const STATUS_PATH: &str = "/status";
pub const MESSAGE_PATH: &str = "/message";
pub const SET_NAME_PATH: &str = "/set-name";

// ── Acknowledgement values ────────────────────────────────────────────────────

/// `status` value of a healthy `/status` reply and of an accepted rename.
pub const STATUS_OK: &str = "ok";
/// `status` value of an acknowledged `/message` command.
pub const STATUS_RECEIVED: &str = "received";
/// `type` field of every command sent to `/message`.
pub const COMMAND_TYPE: &str = "command";

// ── /status ───────────────────────────────────────────────────────────────────

/// Body returned by `GET /status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    /// Self-declared device name.
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    /// Hardware address as the device formats it (usually `AA:BB:...`).
    #[serde(default)]
    pub mac: Option<String>,
}

impl StatusResponse {
    /// `true` when the device declares itself healthy.
    pub fn is_ok(&self) -> bool {
        self.status.as_deref() == Some(STATUS_OK)
    }
}

// ── /message ──────────────────────────────────────────────────────────────────

/// Body posted to `/message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub action: String,
}

impl CommandRequest {
    /// Wraps `action` in a `{type: "command"}` envelope.
    pub fn command(action: impl Into<String>) -> Self {
        Self {
            kind: COMMAND_TYPE.to_string(),
            action: action.into(),
        }
    }
}

/// Body returned by `POST /message`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    #[serde(default)]
    pub status: Option<String>,
}

impl CommandResponse {
    pub fn is_received(&self) -> bool {
        self.status.as_deref() == Some(STATUS_RECEIVED)
    }
}

// ── /set-name ─────────────────────────────────────────────────────────────────

/// Body posted to `/set-name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetNameRequest {
    pub name: String,
}

/// Body returned by `POST /set-name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetNameResponse {
    #[serde(default)]
    pub status: Option<String>,
}

impl SetNameResponse {
    pub fn is_ok(&self) -> bool {
        self.status.as_deref() == Some(STATUS_OK)
    }
}
