//! SNAP error taxonomy (spec.md §7).
//!
//! One `thiserror` variant per named error, grouped into the five code
//! ranges the protocol defines, the way the teacher's `ZVaultError` groups
//! its causes and exposes `error_code()`/`is_retryable()` for API responses.

use thiserror::Error;

/// Root error type for SNAP core operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapError {
    // 1xxx — Task / Message
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("task is not cancelable in its current state: {0}")]
    TaskNotCancelable(String),
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("content type not supported: {0}")]
    ContentTypeNotSupported(String),
    #[error("push notification error: {0}")]
    PushNotificationError(String),
    #[error("method not found: {0}")]
    MethodNotFound(String),

    // 2xxx — Authentication
    #[error("signature invalid")]
    SignatureInvalid,
    #[error("signature missing")]
    SignatureMissing,
    #[error("identity mismatch")]
    IdentityMismatch,
    #[error("timestamp expired")]
    TimestampExpired,
    #[error("identity invalid: {0}")]
    IdentityInvalid(String),
    #[error("duplicate message")]
    DuplicateMessage,

    // 3xxx — Discovery
    #[error("agent not found: {0}")]
    AgentNotFound(String),
    #[error("agent card invalid: {0}")]
    AgentCardInvalid(String),
    #[error("agent card expired")]
    AgentCardExpired,
    #[error("relay connection error: {0}")]
    RelayConnectionError(String),
    #[error("skill not found: {0}")]
    SkillNotFound(String),

    // 4xxx — Transport
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),
    #[error("connection timeout")]
    ConnectionTimeout,
    #[error("connection refused")]
    ConnectionRefused,
    #[error("TLS error: {0}")]
    TLSError(String),
    #[error("WebSocket error: {0}")]
    WebSocketError(String),
    #[error("Nostr delivery error: {0}")]
    NostrDeliveryError(String),

    // 5xxx — System
    #[error("internal error: {0}")]
    InternalError(String),
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },
    #[error("service unavailable")]
    ServiceUnavailable,
    #[error("version not supported: {0}")]
    VersionNotSupported(String),
    #[error("maintenance in progress")]
    Maintenance,
}

impl SnapError {
    /// The integer error code from spec.md §7.
    pub fn error_code(&self) -> u32 {
        match self {
            SnapError::TaskNotFound(_) => 1001,
            SnapError::TaskNotCancelable(_) => 1002,
            SnapError::InvalidMessage(_) => 1003,
            SnapError::InvalidPayload(_) => 1004,
            SnapError::ContentTypeNotSupported(_) => 1005,
            SnapError::PushNotificationError(_) => 1006,
            SnapError::MethodNotFound(_) => 1007,

            SnapError::SignatureInvalid => 2001,
            SnapError::SignatureMissing => 2002,
            SnapError::IdentityMismatch => 2003,
            SnapError::TimestampExpired => 2004,
            SnapError::IdentityInvalid(_) => 2005,
            SnapError::DuplicateMessage => 2006,

            SnapError::AgentNotFound(_) => 3001,
            SnapError::AgentCardInvalid(_) => 3002,
            SnapError::AgentCardExpired => 3003,
            SnapError::RelayConnectionError(_) => 3004,
            SnapError::SkillNotFound(_) => 3005,

            SnapError::TransportUnavailable(_) => 4001,
            SnapError::ConnectionTimeout => 4002,
            SnapError::ConnectionRefused => 4003,
            SnapError::TLSError(_) => 4004,
            SnapError::WebSocketError(_) => 4005,
            SnapError::NostrDeliveryError(_) => 4006,

            SnapError::InternalError(_) => 5001,
            SnapError::RateLimitExceeded { .. } => 5002,
            SnapError::ServiceUnavailable => 5003,
            SnapError::VersionNotSupported(_) => 5004,
            SnapError::Maintenance => 5005,
        }
    }

    /// 1xxx and 2xxx are protocol faults: surface to the sender as an error
    /// payload, never retried automatically. 4xxx and transient 5xxx (5001,
    /// 5003) are candidates for bounded exponential backoff by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SnapError::TransportUnavailable(_)
                | SnapError::ConnectionTimeout
                | SnapError::ConnectionRefused
                | SnapError::TLSError(_)
                | SnapError::WebSocketError(_)
                | SnapError::NostrDeliveryError(_)
                | SnapError::InternalError(_)
                | SnapError::ServiceUnavailable
        )
    }

    /// Seconds the caller should wait before retrying; only 5002 carries one.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            SnapError::RateLimitExceeded { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Render as the `{ error: { code, message, data? } }` envelope from spec.md §6.
    pub fn to_envelope(&self) -> serde_json::Value {
        let mut inner = serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
        });
        if let Some(retry_after) = self.retry_after_secs() {
            inner["data"] = serde_json::json!({ "retryAfter": retry_after });
        }
        serde_json::json!({ "error": inner })
    }
}

pub type Result<T> = std::result::Result<T, SnapError>;
