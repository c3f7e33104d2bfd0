//! Fluent builder for unsigned `SnapMessage`s (spec.md §4.5).

use serde_json::Value;

use super::types::{MessageType, SnapMessage, PROTOCOL_VERSION};

/// Builds an unsigned message. `id`, `from`, `method`, and `timestamp` are
/// required and taken up front; `version` defaults to `"0.1"`, `type`
/// defaults to `request`, and `payload` defaults to `{}`. Repeated setter
/// calls overwrite the previous value. `build` clones the accumulated
/// fields into a fresh `SnapMessage`, so continuing to mutate the builder
/// after calling `build` never affects messages already produced.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    id: String,
    version: String,
    from: String,
    to: Option<String>,
    r#type: MessageType,
    method: String,
    payload: Value,
    timestamp: u64,
}

impl MessageBuilder {
    pub fn new(
        id: impl Into<String>,
        from: impl Into<String>,
        method: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            id: id.into(),
            version: PROTOCOL_VERSION.to_string(),
            from: from.into(),
            to: None,
            r#type: MessageType::Request,
            method: method.into(),
            payload: Value::Object(serde_json::Map::new()),
            timestamp,
        }
    }

    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn message_type(mut self, r#type: MessageType) -> Self {
        self.r#type = r#type;
        self
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn build(&self) -> SnapMessage {
        SnapMessage {
            id: self.id.clone(),
            version: self.version.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
            r#type: self.r#type,
            method: self.method.clone(),
            payload: self.payload.clone(),
            timestamp: self.timestamp,
            sig: None,
        }
    }
}
