//! Inbound/outbound middleware chain (spec.md §4.6, §8 testable property 8).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::common::error::SnapError;
use crate::message::SnapMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone)]
pub struct Context {
    pub message: SnapMessage,
    pub direction: Direction,
}

/// The remaining chain, modeled as a boxed continuation so a middleware can
/// run code both before and after `next` without the caller needing a
/// separate pre/post hook pair.
pub type Next = Box<
    dyn FnOnce(Context) -> Pin<Box<dyn Future<Output = Result<Context, SnapError>> + Send>> + Send,
>;

#[async_trait]
pub trait Middleware: Send + Sync {
    /// Run this middleware, calling `next(ctx)` to continue the chain (or
    /// returning early to short-circuit it — spec.md §8 testable property
    /// S5, no downstream middleware or handler runs after a short-circuit).
    async fn handle(&self, ctx: Context, next: Next) -> Result<Context, SnapError>;
}

/// Fold a `Vec<Arc<dyn Middleware>>` into a single call, in registered
/// order for both directions (spec.md §8 testable property 8: with two
/// middlewares A, B the visible trace is A-pre, B-pre, handler, B-post,
/// A-post).
pub async fn run_chain(
    chain: &[Arc<dyn Middleware>],
    ctx: Context,
    terminal: Next,
) -> Result<Context, SnapError> {
    fn build(chain: &[Arc<dyn Middleware>], terminal: Next) -> Next {
        match chain.split_first() {
            None => terminal,
            Some((first, rest)) => {
                let first = Arc::clone(first);
                let rest_next = build(rest, terminal);
                Box::new(move |ctx| {
                    let first = Arc::clone(&first);
                    Box::pin(async move { first.handle(ctx, rest_next).await })
                })
            }
        }
    }

    build(chain, terminal)(ctx).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KeyPair, Network};
    use crate::message::MessageBuilder;
    use std::sync::Mutex;

    struct Recorder {
        label: &'static str,
        trace: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Middleware for Recorder {
        async fn handle(&self, ctx: Context, next: Next) -> Result<Context, SnapError> {
            self.trace.lock().unwrap().push(format!("{}-pre", self.label));
            let ctx = next(ctx).await?;
            self.trace.lock().unwrap().push(format!("{}-post", self.label));
            Ok(ctx)
        }
    }

    fn sample_ctx() -> Context {
        let alice = KeyPair::from_secret_bytes([0x31; 32], Network::Mainnet).unwrap();
        Context {
            message: MessageBuilder::new("m1", alice.address(), "message/send", 1).build(),
            direction: Direction::Inbound,
        }
    }

    #[tokio::test]
    async fn chain_runs_in_registered_order_around_the_handler() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let a: Arc<dyn Middleware> = Arc::new(Recorder { label: "A", trace: trace.clone() });
        let b: Arc<dyn Middleware> = Arc::new(Recorder { label: "B", trace: trace.clone() });
        let chain = vec![a, b];

        let trace_for_handler = trace.clone();
        let terminal: Next = Box::new(move |ctx| {
            trace_for_handler.lock().unwrap().push("handler".to_string());
            Box::pin(async move { Ok(ctx) })
        });

        run_chain(&chain, sample_ctx(), terminal).await.unwrap();

        let recorded = trace.lock().unwrap().clone();
        assert_eq!(recorded, vec!["A-pre", "B-pre", "handler", "B-post", "A-post"]);
    }

    struct ShortCircuit;

    #[async_trait]
    impl Middleware for ShortCircuit {
        async fn handle(&self, _ctx: Context, _next: Next) -> Result<Context, SnapError> {
            Err(SnapError::InvalidMessage("rejected before next".into()))
        }
    }

    #[tokio::test]
    async fn a_middleware_that_errors_before_next_prevents_the_handler_from_running() {
        let ran_handler = Arc::new(Mutex::new(false));
        let ran_handler_clone = ran_handler.clone();
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(ShortCircuit)];
        let terminal: Next = Box::new(move |ctx| {
            *ran_handler_clone.lock().unwrap() = true;
            Box::pin(async move { Ok(ctx) })
        });

        let result = run_chain(&chain, sample_ctx(), terminal).await;
        assert!(result.is_err());
        assert!(!*ran_handler.lock().unwrap());
    }
}
