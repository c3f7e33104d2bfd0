//! Method dispatch tables (spec.md §4.6): exact-match method name to a
//! boxed async handler.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_stream::Stream;

use crate::common::error::SnapError;
use crate::message::SnapMessage;

/// Handles one request, returning the payload the response should carry.
pub type RequestHandler =
    Arc<dyn Fn(SnapMessage) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, SnapError>> + Send>> + Send + Sync>;

/// Handles one request, returning a lazy, finite, non-restartable sequence
/// of events the caller streams out, terminating the connection after the
/// final item (spec.md §9 design notes, §8 testable property S6).
pub type StreamRequestHandler = Arc<
    dyn Fn(SnapMessage) -> Pin<Box<dyn Future<Output = Result<Pin<Box<dyn Stream<Item = SnapMessage> + Send>>, SnapError>> + Send>>
        + Send
        + Sync,
>;

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, RequestHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, method: impl Into<String>, handler: RequestHandler) {
        self.handlers.write().await.insert(method.into(), handler);
    }

    pub async fn get(&self, method: &str) -> Option<RequestHandler> {
        self.handlers.read().await.get(method).cloned()
    }
}

#[derive(Default)]
pub struct StreamHandlerRegistry {
    handlers: RwLock<HashMap<String, StreamRequestHandler>>,
}

impl StreamHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, method: impl Into<String>, handler: StreamRequestHandler) {
        self.handlers.write().await.insert(method.into(), handler);
    }

    pub async fn get(&self, method: &str) -> Option<StreamRequestHandler> {
        self.handlers.read().await.get(method).cloned()
    }
}
