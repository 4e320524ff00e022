//! Handlers and their wrapping.
//!
//! A handler is an async callable invoked with `(payload, context, kind,
//! messenger)`. It may answer with a full message, a bare kind, or nothing;
//! it may fail with any error, which the dispatcher converts into an error
//! message rather than letting it escape.

use std::future::Future;

use async_trait::async_trait;

use courier_proto::{Context, Draft, Message, Payload};

use crate::messenger::Messenger;

/// What a handler may produce: a full message or a bare kind.
///
/// Returning `None` from a handler means "not my question"; the dispatcher
/// moves on to the next matching handler.
#[derive(Debug, Clone)]
pub enum Response {
    /// A complete reply message.
    Message(Message),
    /// A bare kind; the dispatcher fills payload/context from the request.
    Kind(String),
}

impl From<Message> for Response {
    fn from(message: Message) -> Self {
        Self::Message(message)
    }
}

impl From<&str> for Response {
    fn from(kind: &str) -> Self {
        Self::Kind(kind.to_string())
    }
}

impl From<String> for Response {
    fn from(kind: String) -> Self {
        Self::Kind(kind)
    }
}

impl From<Response> for Draft {
    fn from(response: Response) -> Self {
        match response {
            Response::Message(message) => Draft::Message(message),
            Response::Kind(kind) => Draft::Kind(kind),
        }
    }
}

/// Outcome of one handler invocation.
pub type HandlerResult = anyhow::Result<Option<Response>>;

/// A callable registered against one or more patterns.
///
/// Implementors receive a [`Messenger`] on every call, so handler code never
/// needs a reference to the broker that owns it.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handles one message.
    async fn call(
        &self,
        payload: Payload,
        context: Context,
        kind: String,
        messenger: Messenger,
    ) -> HandlerResult;
}

/// Wraps an async closure as a [`Handler`].
///
/// ```ignore
/// broker.subscribe("GET:USER", handler_fn(|payload, _ctx, _kind, _messenger| async move {
///     Ok(Some(Message::new("USER").with("name", json!("Ada")).into()))
/// }))?;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Payload, Context, String, Messenger) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    FnHandler(f)
}

/// A [`Handler`] backed by a plain async closure. See [`handler_fn`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Payload, Context, String, Messenger) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn call(
        &self,
        payload: Payload,
        context: Context,
        kind: String,
        messenger: Messenger,
    ) -> HandlerResult {
        (self.0)(payload, context, kind, messenger).await
    }
}
