//! Structured logging for message lifecycle events, built the way the
//! teacher's `log_security_event`/`log_api_request` pair wraps `tracing`
//! with a small typed event envelope — generalized here to the
//! received/validated/dispatched/replayed/responded events a SNAP peer
//! emits instead of deposit/withdrawal events.

use serde::Serialize;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::SnapConfig;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to initialize logging: {0}")]
    InitFailed(String),
}

/// A point in a message's journey through the peer pipeline.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageEvent {
    Received,
    Validated,
    Dispatched,
    Replayed,
    Responded,
    Rejected,
}

/// Emit one structured line for a message lifecycle event. `error` is set
/// only for `Rejected`.
pub fn log_message_event(
    event: MessageEvent,
    from: &str,
    method: &str,
    id: &str,
    error: Option<&str>,
) {
    match event {
        MessageEvent::Rejected => {
            tracing::warn!(
                target: "snap::pipeline",
                event = ?event,
                from,
                method,
                id,
                error,
                "message rejected"
            );
        }
        _ => {
            tracing::info!(
                target: "snap::pipeline",
                event = ?event,
                from,
                method,
                id,
                "message {:?}",
                event
            );
        }
    }
}

/// Initialize `tracing-subscriber`: JSON layer on mainnet (log aggregation
/// friendly), pretty layer otherwise.
pub fn init_logging(level: &str, json_format: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("snap_core={level},tower_http={level},axum={level}")));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))
    }
}

pub fn init_from_config(config: &SnapConfig) -> Result<(), LoggingError> {
    init_logging(&config.log_level, config.log_json)
}
