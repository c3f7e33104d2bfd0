//! Structural and cryptographic validation (spec.md §4.4).

use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;

use crate::common::error::SnapError;

use super::signing::verify;
use super::types::{MessageType, SnapMessage};

fn id_pattern() -> &'static Regex {
    static ID: OnceLock<Regex> = OnceLock::new();
    ID.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").expect("valid regex"))
}

/// `from` and `to`, when both present, must share a network prefix
/// (spec.md §3 invariant) — compare the bech32m HRP+witness-version prefix
/// rather than decoding both addresses to their `Network`.
fn same_network_prefix(from: &str, to: &str) -> bool {
    from.get(..4) == to.get(..4)
}

fn method_pattern() -> &'static Regex {
    static METHOD: OnceLock<Regex> = OnceLock::new();
    METHOD.get_or_init(|| Regex::new(r"^[a-z]+/[a-z_]+$").expect("valid regex"))
}

/// Options governing `validate`. Timestamps are evaluated against the
/// wall-clock time passed in `now`, not sampled internally, so callers can
/// test deterministically and agents can share one clock reading across a
/// batch of messages.
#[derive(Debug, Clone, Copy)]
pub struct ValidateOptions {
    pub now: u64,
    pub max_skew_secs: u64,
    pub require_signature_on_request: bool,
}

impl ValidateOptions {
    pub fn at(now: u64) -> Self {
        Self {
            now,
            max_skew_secs: 60,
            require_signature_on_request: true,
        }
    }

    pub fn now() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::at(now)
    }

    pub fn max_skew_secs(mut self, secs: u64) -> Self {
        self.max_skew_secs = secs;
        self
    }
}

/// Field-presence and pattern checks only. Never raises; any deviation,
/// including a malformed JSON shape, yields `false` rather than a panic or
/// error, so it is safe to call on untrusted, pre-deserialization input
/// (spec.md §8 testable property 4).
pub fn validate_structure(value: &serde_json::Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };

    let Some(id) = obj.get("id").and_then(|v| v.as_str()) else {
        return false;
    };
    if !id_pattern().is_match(id) {
        return false;
    }

    if obj.get("version").and_then(|v| v.as_str()) != Some(super::types::PROTOCOL_VERSION) {
        return false;
    }

    let Some(from) = obj.get("from").and_then(|v| v.as_str()) else {
        return false;
    };
    if !crate::crypto::validate_address(from) {
        return false;
    }

    if let Some(to) = obj.get("to") {
        match to.as_str() {
            Some(to) if crate::crypto::validate_address(to) && same_network_prefix(from, to) => {}
            _ => return false,
        }
    }

    let Some(type_str) = obj.get("type").and_then(|v| v.as_str()) else {
        return false;
    };
    if !matches!(type_str, "request" | "response" | "event") {
        return false;
    }

    let Some(method) = obj.get("method").and_then(|v| v.as_str()) else {
        return false;
    };
    if !method_pattern().is_match(method) {
        return false;
    }

    if !obj.contains_key("payload") {
        return false;
    }

    if obj.get("timestamp").and_then(|v| v.as_u64()).is_none() {
        return false;
    }

    if let Some(sig) = obj.get("sig") {
        match sig.as_str() {
            Some(sig) if sig.len() == 128 && sig.bytes().all(|b| b.is_ascii_hexdigit()) => {}
            _ => return false,
        }
    }

    true
}

/// Full validation: structural shape, payload size/depth caps, timestamp
/// window, then signature policy. The size/depth cap is enforced before
/// signature verification so an oversized payload is rejected cheaply
/// without paying for a Schnorr verification (spec.md §9 Open Question c).
pub fn validate(message: &SnapMessage, options: ValidateOptions) -> Result<(), SnapError> {
    if message.version != super::types::PROTOCOL_VERSION {
        return Err(SnapError::VersionNotSupported(message.version.clone()));
    }

    let as_value = serde_json::to_value(message)
        .map_err(|e| SnapError::InvalidMessage(format!("message is not representable as JSON: {e}")))?;
    if !validate_structure(&as_value) {
        return Err(SnapError::InvalidMessage("message failed structural validation".into()));
    }

    let canonical_len = crate::canonical::canonicalize(&message.payload)
        .map_err(|e| SnapError::InvalidPayload(e.to_string()))?
        .len();
    if canonical_len > crate::canonical::MAX_PAYLOAD_BYTES {
        return Err(SnapError::InvalidPayload(format!(
            "payload exceeds {} canonicalized bytes",
            crate::canonical::MAX_PAYLOAD_BYTES
        )));
    }
    if crate::canonical::depth(&message.payload) > crate::canonical::MAX_PAYLOAD_DEPTH {
        return Err(SnapError::InvalidPayload(format!(
            "payload exceeds depth {}",
            crate::canonical::MAX_PAYLOAD_DEPTH
        )));
    }

    let skew = options.now.abs_diff(message.timestamp);
    if skew > options.max_skew_secs {
        return Err(SnapError::TimestampExpired);
    }

    match (&message.r#type, &message.sig) {
        (MessageType::Request, None) if options.require_signature_on_request => {
            Err(SnapError::SignatureMissing)
        }
        (_, None) => Ok(()),
        (_, Some(sig)) => {
            if verify(message, sig) {
                Ok(())
            } else {
                Err(SnapError::SignatureInvalid)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KeyPair, Network};
    use crate::message::builder::MessageBuilder;
    use crate::message::signing::sign;
    use serde_json::json;

    fn keypair(seed: u8) -> KeyPair {
        KeyPair::from_secret_bytes([seed; 32], Network::Mainnet).unwrap()
    }

    #[test]
    fn structure_check_never_panics_on_garbage() {
        assert!(!validate_structure(&json!(null)));
        assert!(!validate_structure(&json!([1, 2, 3])));
        assert!(!validate_structure(&json!({"id": "!!!"})));
        assert!(!validate_structure(&json!("just a string")));
    }

    #[test]
    fn accepts_a_well_formed_unsigned_message() {
        let alice = keypair(0xB1);
        let msg = MessageBuilder::new("msg-001", alice.address(), "message/send", 1).build();
        let value = serde_json::to_value(&msg).unwrap();
        assert!(validate_structure(&value));
    }

    #[test]
    fn structure_check_rejects_an_unsupported_version() {
        let alice = keypair(0xB8);
        let mut msg = MessageBuilder::new("msg-007", alice.address(), "message/send", 1).build();
        msg.version = "9.9".to_string();
        let value = serde_json::to_value(&msg).unwrap();
        assert!(!validate_structure(&value));
    }

    #[test]
    fn full_validate_rejects_an_unsupported_version_before_other_checks() {
        let alice = keypair(0xB9);
        let mut msg = MessageBuilder::new("msg-008", alice.address(), "message/send", 1_000)
            .payload(json!({"ping": true}))
            .build();
        msg.version = "0.2".to_string();
        msg.sig = Some(sign(&msg, &alice).unwrap());

        let err = validate(&msg, ValidateOptions::at(1_000)).unwrap_err();
        assert_eq!(err, SnapError::VersionNotSupported("0.2".into()));
    }

    #[test]
    fn full_validate_accepts_a_signed_request_within_skew() {
        let alice = keypair(0xB2);
        let mut msg = MessageBuilder::new("msg-002", alice.address(), "message/send", 1_000)
            .payload(json!({"ping": true}))
            .build();
        msg.sig = Some(sign(&msg, &alice).unwrap());

        let options = ValidateOptions::at(1_010);
        assert!(validate(&msg, options).is_ok());
    }

    #[test]
    fn full_validate_rejects_missing_signature_on_a_request() {
        let alice = keypair(0xB3);
        let msg = MessageBuilder::new("msg-003", alice.address(), "message/send", 1_000).build();
        let err = validate(&msg, ValidateOptions::at(1_000)).unwrap_err();
        assert_eq!(err, SnapError::SignatureMissing);
    }

    #[test]
    fn full_validate_rejects_a_stale_timestamp() {
        let alice = keypair(0xB4);
        let mut msg = MessageBuilder::new("msg-004", alice.address(), "message/send", 1_000).build();
        msg.sig = Some(sign(&msg, &alice).unwrap());

        let err = validate(&msg, ValidateOptions::at(2_000)).unwrap_err();
        assert_eq!(err, SnapError::TimestampExpired);
    }

    #[test]
    fn full_validate_rejects_a_tampered_signature() {
        let alice = keypair(0xB5);
        let mut msg = MessageBuilder::new("msg-005", alice.address(), "message/send", 1_000).build();
        msg.sig = Some(sign(&msg, &alice).unwrap());
        msg.method = "message/other".to_string();

        let err = validate(&msg, ValidateOptions::at(1_000)).unwrap_err();
        assert_eq!(err, SnapError::SignatureInvalid);
    }

    #[test]
    fn full_validate_rejects_an_oversized_payload_before_checking_the_signature() {
        let alice = keypair(0xB6);
        let big_string = "x".repeat(crate::canonical::MAX_PAYLOAD_BYTES + 10);
        let msg = MessageBuilder::new("msg-006", alice.address(), "message/send", 1_000)
            .payload(json!({ "blob": big_string }))
            .message_type(MessageType::Event)
            .build();

        let err = validate(&msg, ValidateOptions::at(1_000)).unwrap_err();
        assert_eq!(err, SnapError::InvalidPayload(format!(
            "payload exceeds {} canonicalized bytes",
            crate::canonical::MAX_PAYLOAD_BYTES
        )));
    }

    #[test]
    fn responses_and_events_may_omit_a_signature() {
        let alice = keypair(0xB7);
        let msg = MessageBuilder::new("evt-001", alice.address(), "message/event", 1_000)
            .message_type(MessageType::Event)
            .build();
        assert!(validate(&msg, ValidateOptions::at(1_000)).is_ok());
    }
}
