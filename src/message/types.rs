//! The on-wire `SnapMessage` record (spec.md §3, §6).

use serde::{Deserialize, Serialize};

/// `type` field: one of `request`, `response`, `event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Request,
    Response,
    Event,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Request => "request",
            MessageType::Response => "response",
            MessageType::Event => "event",
        }
    }
}

/// A SNAP message, signed or unsigned. The unsigned form simply omits `sig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapMessage {
    pub id: String,
    pub version: String,
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub to: Option<String>,
    #[serde(rename = "type")]
    pub r#type: MessageType,
    pub method: String,
    #[serde(default = "default_payload")]
    pub payload: serde_json::Value,
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sig: Option<String>,
}

fn default_payload() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// The SNAP protocol version this crate implements.
pub const PROTOCOL_VERSION: &str = "0.1";
