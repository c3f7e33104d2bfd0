//! The peer pipeline (spec.md §4.6): one `Agent` per identity, owning its
//! keypair, dispatch tables, middleware chain, optional stores, and ordered
//! transports. `process_message` takes `&self` and is safe to call
//! concurrently from multiple Tokio tasks (spec.md §11); the only shared
//! mutable state is inside the replay/task stores.

pub mod middleware;
pub mod registry;

use std::pin::Pin;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio_stream::Stream;
use uuid::Uuid;

use crate::common::error::SnapError;
use crate::crypto::KeyPair;
use crate::message::{sign, MessageBuilder, MessageType, SnapMessage, ValidateOptions};
use crate::storage::{ReplayStore, TaskStore};
use crate::transport::{InboundHandler, InboundStreamHandler, StreamingTransport, Transport};

use middleware::{run_chain, Context, Direction, Middleware, Next};
use registry::{HandlerRegistry, RequestHandler, StreamHandlerRegistry, StreamRequestHandler};

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

pub struct Agent {
    keypair: KeyPair,
    handlers: Arc<HandlerRegistry>,
    stream_handlers: Arc<StreamHandlerRegistry>,
    middleware: Vec<Arc<dyn Middleware>>,
    replay_store: Option<Arc<dyn ReplayStore>>,
    task_store: Option<Arc<dyn TaskStore>>,
    transports: Vec<Arc<dyn Transport>>,
    streaming_transports: Vec<Arc<dyn StreamingTransport>>,
}

impl Agent {
    pub fn builder(keypair: KeyPair) -> AgentBuilder {
        AgentBuilder::new(keypair)
    }

    pub fn address(&self) -> &str {
        self.keypair.address()
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    pub fn task_store(&self) -> Option<&Arc<dyn TaskStore>> {
        self.task_store.as_ref()
    }

    async fn addressing_check(&self, message: &SnapMessage) -> Result<(), SnapError> {
        match &message.to {
            Some(to) if to != self.address() => Err(SnapError::InvalidMessage(format!(
                "message addressed to {to}, not this agent ({})",
                self.address()
            ))),
            _ => Ok(()),
        }
    }

    async fn replay_check(&self, message: &SnapMessage) -> Result<(), SnapError> {
        let Some(store) = &self.replay_store else {
            return Ok(());
        };
        if store.check_and_mark(&message.from, &message.id).await.map_err(|e| {
            SnapError::InternalError(e.to_string())
        })? {
            return Err(SnapError::DuplicateMessage);
        }
        Ok(())
    }

    fn build_response(&self, request: &SnapMessage, payload: serde_json::Value) -> Result<SnapMessage, SnapError> {
        let mut response = MessageBuilder::new(Uuid::new_v4().to_string(), self.address(), &request.method, now_secs())
            .to(request.from.clone())
            .message_type(MessageType::Response)
            .payload(payload)
            .build();
        let sig = sign(&response, &self.keypair).map_err(|e| SnapError::InternalError(e.to_string()))?;
        response.sig = Some(sig);
        Ok(response)
    }

    /// Inbound request pipeline: validate -> addressing -> replay
    /// check+record -> inbound middleware -> dispatch -> sign response.
    pub async fn process_message(&self, message: SnapMessage) -> Result<SnapMessage, SnapError> {
        crate::message::validate(&message, ValidateOptions::now())?;
        self.addressing_check(&message).await?;
        self.replay_check(&message).await?;

        let handlers = Arc::clone(&self.handlers);
        let ctx = Context { message, direction: Direction::Inbound };

        let terminal: Next = Box::new(move |ctx: Context| {
            Box::pin(async move {
                let Some(handler) = handlers.get(&ctx.message.method).await else {
                    return Err(SnapError::MethodNotFound(ctx.message.method.clone()));
                };
                let payload = handler(ctx.message.clone()).await?;
                Ok(Context { message: SnapMessage { payload, ..ctx.message }, direction: ctx.direction })
            })
        });

        let result_ctx = run_chain(&self.middleware, ctx, terminal).await?;
        self.build_response(&result_ctx.message, result_ctx.message.payload.clone())
    }

    /// Inbound streaming pipeline: same steps against the stream registry;
    /// every yielded item is signed if unsigned, ordering preserved.
    pub async fn process_stream(
        self: &Arc<Self>,
        message: SnapMessage,
    ) -> Result<Pin<Box<dyn Stream<Item = SnapMessage> + Send>>, SnapError> {
        crate::message::validate(&message, ValidateOptions::now())?;
        self.addressing_check(&message).await?;
        self.replay_check(&message).await?;

        let Some(handler) = self.stream_handlers.get(&message.method).await else {
            return Err(SnapError::MethodNotFound(message.method.clone()));
        };

        let inner = handler(message).await?;
        let agent = Arc::clone(self);
        let signed = inner.map(move |mut item| {
            if item.sig.is_none() {
                if let Ok(sig) = sign(&item, &agent.keypair) {
                    item.sig = Some(sig);
                }
            }
            item
        });
        Ok(Box::pin(signed))
    }

    /// Outbound send: build an unsigned request, sign it, run outbound
    /// middleware, then try transports in registered order, returning the
    /// last error if every transport fails.
    pub async fn send(
        &self,
        to: impl Into<String>,
        method: impl Into<String>,
        payload: serde_json::Value,
        endpoint: &str,
    ) -> Result<SnapMessage, SnapError> {
        let mut request = MessageBuilder::new(Uuid::new_v4().to_string(), self.address(), method, now_secs())
            .to(to)
            .payload(payload)
            .build();
        let sig = sign(&request, &self.keypair).map_err(|e| SnapError::InternalError(e.to_string()))?;
        request.sig = Some(sig);

        let ctx = Context { message: request, direction: Direction::Outbound };
        let transports = self.transports.clone();
        let endpoint = endpoint.to_string();

        let terminal: Next = Box::new(move |ctx: Context| {
            Box::pin(async move {
                let mut last_err = SnapError::TransportUnavailable("no transports configured".into());
                for transport in &transports {
                    match transport.send(&endpoint, ctx.message.clone()).await {
                        Ok(response) => return Ok(Context { message: response, direction: ctx.direction }),
                        Err(err) => last_err = err,
                    }
                }
                Err(last_err)
            })
        });

        let result = run_chain(&self.middleware, ctx, terminal).await?;
        Ok(result.message)
    }

    /// Outbound streaming send: same construction through middleware, then
    /// the first configured streaming transport is used.
    pub async fn send_stream(
        &self,
        to: impl Into<String>,
        method: impl Into<String>,
        payload: serde_json::Value,
        endpoint: &str,
    ) -> Result<Pin<Box<dyn Stream<Item = SnapMessage> + Send>>, SnapError> {
        let mut request = MessageBuilder::new(Uuid::new_v4().to_string(), self.address(), method, now_secs())
            .to(to)
            .payload(payload)
            .build();
        let sig = sign(&request, &self.keypair).map_err(|e| SnapError::InternalError(e.to_string()))?;
        request.sig = Some(sig);

        let Some(transport) = self.streaming_transports.first() else {
            return Err(SnapError::TransportUnavailable("no streaming transport configured".into()));
        };
        transport.send_stream(endpoint, request).await
    }

    /// Wrap `process_message` as an `InboundHandler` for a `Transport` to drive.
    pub fn inbound_handler(self: &Arc<Self>) -> InboundHandler {
        let agent = Arc::clone(self);
        Arc::new(move |message: SnapMessage| {
            let agent = Arc::clone(&agent);
            Box::pin(async move { agent.process_message(message).await })
        })
    }

    /// Wrap `process_stream` as an `InboundStreamHandler`.
    pub fn inbound_stream_handler(self: &Arc<Self>) -> InboundStreamHandler {
        let agent = Arc::clone(self);
        Arc::new(move |message: SnapMessage| {
            let agent = Arc::clone(&agent);
            Box::pin(async move { agent.process_stream(message).await })
        })
    }

    pub async fn register_handler(&self, method: impl Into<String>, handler: RequestHandler) {
        self.handlers.register(method, handler).await;
    }

    pub async fn register_stream_handler(&self, method: impl Into<String>, handler: StreamRequestHandler) {
        self.stream_handlers.register(method, handler).await;
    }
}

pub struct AgentBuilder {
    keypair: KeyPair,
    middleware: Vec<Arc<dyn Middleware>>,
    replay_store: Option<Arc<dyn ReplayStore>>,
    task_store: Option<Arc<dyn TaskStore>>,
    transports: Vec<Arc<dyn Transport>>,
    streaming_transports: Vec<Arc<dyn StreamingTransport>>,
}

impl AgentBuilder {
    pub fn new(keypair: KeyPair) -> Self {
        Self {
            keypair,
            middleware: Vec::new(),
            replay_store: None,
            task_store: None,
            transports: Vec::new(),
            streaming_transports: Vec::new(),
        }
    }

    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn replay_store(mut self, store: Arc<dyn ReplayStore>) -> Self {
        self.replay_store = Some(store);
        self
    }

    pub fn task_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.task_store = Some(store);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transports.push(transport);
        self
    }

    pub fn streaming_transport(mut self, transport: Arc<dyn StreamingTransport>) -> Self {
        self.streaming_transports.push(transport);
        self
    }

    pub fn build(self) -> Arc<Agent> {
        Arc::new(Agent {
            keypair: self.keypair,
            handlers: Arc::new(HandlerRegistry::new()),
            stream_handlers: Arc::new(StreamHandlerRegistry::new()),
            middleware: self.middleware,
            replay_store: self.replay_store,
            task_store: self.task_store,
            transports: self.transports,
            streaming_transports: self.streaming_transports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Network;
    use crate::storage::InMemoryReplayStore;
    use serde_json::json;

    fn keypair(seed: u8) -> KeyPair {
        KeyPair::from_secret_bytes([seed; 32], Network::Mainnet).unwrap()
    }

    fn echo_handler() -> RequestHandler {
        Arc::new(|message: SnapMessage| Box::pin(async move { Ok(message.payload) }))
    }

    #[tokio::test]
    async fn dispatch_routes_only_to_an_exact_method_match() {
        let bob = keypair(0xC1);
        let agent = Agent::builder(bob).build();
        agent.register_handler("message/echo", echo_handler()).await;

        let alice = keypair(0xC2);
        let mut request = MessageBuilder::new("req-1", alice.address(), "message/other", now_secs())
            .to(agent.address())
            .payload(json!({"x": 1}))
            .build();
        request.sig = Some(sign(&request, &alice).unwrap());

        let err = agent.process_message(request).await.unwrap_err();
        assert_eq!(err, SnapError::MethodNotFound("message/other".into()));
    }

    #[tokio::test]
    async fn a_registered_handler_produces_a_signed_response_addressed_back_to_the_sender() {
        let bob = keypair(0xC3);
        let agent = Agent::builder(bob).build();
        agent.register_handler("message/echo", echo_handler()).await;

        let alice = keypair(0xC4);
        let mut request = MessageBuilder::new("req-2", alice.address(), "message/echo", now_secs())
            .to(agent.address())
            .payload(json!({"ping": true}))
            .build();
        request.sig = Some(sign(&request, &alice).unwrap());

        let response = agent.process_message(request).await.unwrap();
        assert_eq!(response.to.as_deref(), Some(alice.address()));
        assert_eq!(response.payload, json!({"ping": true}));
        assert!(crate::message::verify_self(&response));
    }

    #[tokio::test]
    async fn a_second_delivery_of_the_same_from_id_pair_is_rejected_as_a_duplicate() {
        let bob = keypair(0xC5);
        let replay_store = Arc::new(InMemoryReplayStore::new());
        let agent = Agent::builder(bob).replay_store(replay_store).build();
        agent.register_handler("message/echo", echo_handler()).await;

        let alice = keypair(0xC6);
        let mut request = MessageBuilder::new("req-3", alice.address(), "message/echo", now_secs())
            .to(agent.address())
            .payload(json!({}))
            .build();
        request.sig = Some(sign(&request, &alice).unwrap());

        assert!(agent.process_message(request.clone()).await.is_ok());
        let err = agent.process_message(request).await.unwrap_err();
        assert_eq!(err, SnapError::DuplicateMessage);
    }

    #[tokio::test]
    async fn streaming_handler_yields_events_then_a_response_in_order() {
        use futures_util::StreamExt;

        let bob = keypair(0xCA);
        let agent = Agent::builder(bob).build();

        let stream_handler: StreamRequestHandler = Arc::new(|message: SnapMessage| {
            Box::pin(async move {
                let from = message.to.clone().unwrap_or_default();
                let to = message.from.clone();
                let mut items = Vec::with_capacity(4);
                for i in 0..3 {
                    items.push(
                        MessageBuilder::new(format!("evt-{i}"), from.clone(), &message.method, now_secs())
                            .to(to.clone())
                            .message_type(MessageType::Event)
                            .payload(json!({ "seq": i }))
                            .build(),
                    );
                }
                items.push(
                    MessageBuilder::new("resp-final", from, &message.method, now_secs())
                        .to(to)
                        .message_type(MessageType::Response)
                        .payload(json!({ "done": true }))
                        .build(),
                );
                let stream: Pin<Box<dyn Stream<Item = SnapMessage> + Send>> =
                    Box::pin(tokio_stream::iter(items));
                Ok(stream)
            })
        });
        agent.register_stream_handler("task/subscribe", stream_handler).await;

        let alice = keypair(0xCB);
        let mut request = MessageBuilder::new("req-5", alice.address(), "task/subscribe", now_secs())
            .to(agent.address())
            .payload(json!({}))
            .build();
        request.sig = Some(sign(&request, &alice).unwrap());

        let stream = agent.process_stream(request).await.unwrap();
        let received: Vec<SnapMessage> = stream.collect().await;

        assert_eq!(received.len(), 4);
        assert_eq!(received[0].r#type, MessageType::Event);
        assert_eq!(received[1].r#type, MessageType::Event);
        assert_eq!(received[2].r#type, MessageType::Event);
        assert_eq!(received[3].r#type, MessageType::Response);
        assert_eq!(received[0].payload, json!({ "seq": 0 }));
        assert_eq!(received[2].payload, json!({ "seq": 2 }));
        for item in &received {
            assert!(crate::message::verify_self(item));
        }
    }

    #[tokio::test]
    async fn a_message_addressed_to_someone_else_is_rejected() {
        let bob = keypair(0xC7);
        let agent = Agent::builder(bob).build();
        agent.register_handler("message/echo", echo_handler()).await;

        let alice = keypair(0xC8);
        let someone_else = keypair(0xC9);
        let mut request = MessageBuilder::new("req-4", alice.address(), "message/echo", now_secs())
            .to(someone_else.address())
            .payload(json!({}))
            .build();
        request.sig = Some(sign(&request, &alice).unwrap());

        let err = agent.process_message(request).await.unwrap_err();
        assert!(matches!(err, SnapError::InvalidMessage(_)));
    }
}
