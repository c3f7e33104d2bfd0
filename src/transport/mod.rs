//! Transport contracts (spec.md §4.7): the capability set a peer transport
//! conforms to, represented as a trait object so an `Agent` can hold an
//! ordered `Vec<Arc<dyn Transport>>` and fall back to the next transport
//! on error.

pub mod http;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_stream::Stream;

use crate::common::error::SnapError;
use crate::message::SnapMessage;

/// An inbound message handler a transport drives when it accepts a
/// connection. Kept as a plain boxed closure (rather than a dependency on
/// `Agent` directly) so `transport` does not depend on `agent`; `Agent`
/// supplies one of these bound to `Agent::process_message`.
pub type InboundHandler =
    Arc<dyn Fn(SnapMessage) -> Pin<Box<dyn Future<Output = Result<SnapMessage, SnapError>> + Send>> + Send + Sync>;

pub type InboundStreamHandler = Arc<
    dyn Fn(SnapMessage) -> Pin<Box<dyn Future<Output = Result<Pin<Box<dyn Stream<Item = SnapMessage> + Send>>, SnapError>> + Send>>
        + Send
        + Sync,
>;

/// Minimal transport contract: every transport can send. `listen` and
/// `close` have default no-op/unsupported implementations, since not every
/// transport accepts inbound connections (spec.md §4.7).
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, endpoint: &str, message: SnapMessage) -> Result<SnapMessage, SnapError>;

    async fn listen(&self, _bind_address: &str, _handler: InboundHandler) -> Result<(), SnapError> {
        Err(SnapError::TransportUnavailable(format!(
            "{} does not support listen",
            self.name()
        )))
    }

    async fn close(&self) -> Result<(), SnapError> {
        Ok(())
    }
}

/// Extension for transports that can carry a server-sent stream of
/// messages instead of a single response (spec.md §4.7, §8 testable
/// property S6).
#[async_trait]
pub trait StreamingTransport: Transport {
    async fn send_stream(
        &self,
        endpoint: &str,
        message: SnapMessage,
    ) -> Result<Pin<Box<dyn Stream<Item = SnapMessage> + Send>>, SnapError>;

    async fn listen_stream(
        &self,
        _bind_address: &str,
        _handler: InboundStreamHandler,
    ) -> Result<(), SnapError> {
        Err(SnapError::TransportUnavailable(format!(
            "{} does not support streaming listen",
            self.name()
        )))
    }
}
