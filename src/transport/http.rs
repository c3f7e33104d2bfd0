//! Reference HTTP transport: `axum` for inbound, `reqwest` for outbound,
//! `tower-http` CORS, matching the shape of the teacher's
//! `create_router`/`start_server` pair in `api.rs`. Streaming rides
//! server-sent events via `axum::response::sse`.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use futures_util::StreamExt;
use tokio_stream::Stream;
use tower_http::cors::{Any, CorsLayer};

use crate::common::error::SnapError;
use crate::message::SnapMessage;

use super::{InboundHandler, InboundStreamHandler, StreamingTransport, Transport};

/// Plaintext JSON-over-HTTP transport. A production deployment terminates
/// TLS in front of it, the same way the teacher's Axum services do not
/// self-terminate TLS.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client builds with static config"),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn map_reqwest_err(err: reqwest::Error) -> SnapError {
    if err.is_timeout() {
        SnapError::ConnectionTimeout
    } else if err.is_connect() {
        SnapError::ConnectionRefused
    } else {
        SnapError::TransportUnavailable(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, endpoint: &str, message: SnapMessage) -> Result<SnapMessage, SnapError> {
        let response = self
            .client
            .post(endpoint)
            .json(&message)
            .send()
            .await
            .map_err(map_reqwest_err)?;

        if !response.status().is_success() {
            return Err(SnapError::TransportUnavailable(format!(
                "{} replied with status {}",
                endpoint,
                response.status()
            )));
        }

        response
            .json::<SnapMessage>()
            .await
            .map_err(|e| SnapError::InvalidMessage(e.to_string()))
    }

    async fn listen(&self, bind_address: &str, handler: InboundHandler) -> Result<(), SnapError> {
        let router = build_router(handler);
        let listener = tokio::net::TcpListener::bind(bind_address)
            .await
            .map_err(|e| SnapError::TransportUnavailable(e.to_string()))?;
        axum::serve(listener, router)
            .await
            .map_err(|e| SnapError::TransportUnavailable(e.to_string()))
    }
}

#[async_trait]
impl StreamingTransport for HttpTransport {
    async fn send_stream(
        &self,
        endpoint: &str,
        message: SnapMessage,
    ) -> Result<Pin<Box<dyn Stream<Item = SnapMessage> + Send>>, SnapError> {
        let response = self
            .client
            .post(endpoint)
            .header("Accept", "text/event-stream")
            .json(&message)
            .send()
            .await
            .map_err(map_reqwest_err)?;

        if !response.status().is_success() {
            return Err(SnapError::TransportUnavailable(format!(
                "{} replied with status {}",
                endpoint,
                response.status()
            )));
        }

        let byte_stream = response.bytes_stream();
        let messages = byte_stream.filter_map(|chunk| async move {
            let chunk = chunk.ok()?;
            let text = std::str::from_utf8(&chunk).ok()?;
            let data = text.strip_prefix("data: ")?.trim_end();
            serde_json::from_str::<SnapMessage>(data).ok()
        });

        Ok(Box::pin(messages))
    }

    async fn listen_stream(
        &self,
        bind_address: &str,
        handler: InboundStreamHandler,
    ) -> Result<(), SnapError> {
        let router = build_stream_router(handler);
        let listener = tokio::net::TcpListener::bind(bind_address)
            .await
            .map_err(|e| SnapError::TransportUnavailable(e.to_string()))?;
        axum::serve(listener, router)
            .await
            .map_err(|e| SnapError::TransportUnavailable(e.to_string()))
    }
}

#[derive(Clone)]
struct RouterState {
    handler: InboundHandler,
}

#[derive(Clone)]
struct StreamRouterState {
    handler: InboundStreamHandler,
}

async fn handle_inbound(
    State(state): State<RouterState>,
    Json(message): Json<SnapMessage>,
) -> impl IntoResponse {
    match (state.handler)(message).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => Json(err.to_envelope()).into_response(),
    }
}

async fn handle_inbound_stream(
    State(state): State<StreamRouterState>,
    Json(message): Json<SnapMessage>,
) -> impl IntoResponse {
    match (state.handler)(message).await {
        Ok(stream) => {
            let events = stream.map(|message| {
                let data = serde_json::to_string(&message).unwrap_or_default();
                Ok::<_, std::convert::Infallible>(Event::default().data(data))
            });
            Sse::new(events).into_response()
        }
        Err(err) => Json(err.to_envelope()).into_response(),
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
}

fn build_router(handler: InboundHandler) -> Router {
    Router::new()
        .route("/", post(handle_inbound))
        .layer(cors_layer())
        .with_state(RouterState { handler })
}

fn build_stream_router(handler: InboundStreamHandler) -> Router {
    Router::new()
        .route("/", post(handle_inbound_stream))
        .layer(cors_layer())
        .with_state(StreamRouterState { handler })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::crypto::{KeyPair, Network};
    use crate::message::MessageBuilder;

    fn keypair() -> KeyPair {
        KeyPair::from_secret_bytes([0x71; 32], Network::Mainnet).unwrap()
    }

    #[tokio::test]
    async fn router_dispatches_to_the_inbound_handler() {
        let alice = keypair();
        let handler: InboundHandler = std::sync::Arc::new(move |message: SnapMessage| {
            Box::pin(async move {
                Ok(MessageBuilder::new("resp-1", message.to.clone().unwrap_or_default(), "message/ack", message.timestamp)
                    .to(message.from)
                    .build())
            })
        });

        let router = build_router(handler);
        let body = serde_json::to_vec(
            &MessageBuilder::new("msg-1", alice.address(), "message/send", 1).build(),
        )
        .unwrap();

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
