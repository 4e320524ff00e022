//! The broker: registration entry points, dispatch, and reply resolution.

use std::sync::{Arc, RwLock};

use serde_json::json;
use tracing::debug;

use courier_proto::{
    Context, Draft, Message, NamedError, Payload, Result, error_message, named_error_message,
    normalize,
};

use crate::handler::Handler;
use crate::messenger::Messenger;
use crate::registry::Registry;
use crate::service::{Registrant, Subscriptions};

/// Name under which the broker reports its own failures; the codec renders
/// it as the `COURIER_ERROR` kind.
const BROKER_ERROR: &str = "CourierError";

/// An in-process message broker.
///
/// Handlers subscribe with glob patterns; callers `tell` (fire-and-forget
/// broadcast) or `ask` (request expecting exactly one reply). The broker is
/// a cheap cloneable handle; clones share one subscription registry.
///
/// Dispatch spawns onto the ambient Tokio runtime, so `tell`, `throw`,
/// `listen`, and registration (which broadcasts `SUBSCRIBED`) must run
/// inside one.
#[derive(Clone, Default)]
pub struct Broker {
    registry: Arc<RwLock<Registry>>,
}

impl Broker {
    /// Creates a broker with no subscriptions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a capability handle bound to this broker.
    pub fn messenger(&self) -> Messenger {
        Messenger::new(self.clone())
    }

    /// Subscribes `handler` to every message kind matching `pattern`, then
    /// broadcasts `SUBSCRIBED {patterns: [pattern]}`.
    pub fn subscribe(&self, pattern: &str, handler: impl Handler + 'static) -> Result<&Self> {
        let text = self.install_one(pattern, Arc::new(handler))?;
        self.announce(vec![text], None);
        Ok(self)
    }

    /// Like [`Broker::subscribe`], without the `SUBSCRIBED` broadcast.
    pub fn subscribe_quiet(
        &self,
        pattern: &str,
        handler: impl Handler + 'static,
    ) -> Result<&Self> {
        self.install_one(pattern, Arc::new(handler))?;
        Ok(self)
    }

    /// Registers a [`Registrant`]: a handler map, a service, a factory, or a
    /// list of those. Each unit gets one batched `SUBSCRIBED` broadcast.
    pub fn register(&self, registrant: impl Into<Registrant>) -> Result<&Self> {
        match registrant.into() {
            Registrant::List(registrants) => {
                for registrant in registrants {
                    self.register(registrant)?;
                }
            }
            Registrant::Factory(factory) => {
                self.register(factory())?;
            }
            Registrant::Handlers(subscriptions) => {
                let patterns = self.install(subscriptions)?;
                self.announce(patterns, None);
            }
            Registrant::Service(service) => {
                let name = service.name();
                let subscriptions = service.subscribe(self.messenger());
                let patterns = self.install(subscriptions)?;
                debug!(service = name, "service registered");
                self.announce(patterns, Some(name));
            }
        }
        Ok(self)
    }

    /// Broadcasts to every matching handler without waiting for any of them,
    /// and returns the normalized event.
    ///
    /// Each handler runs in its own task: a failing handler cannot affect its
    /// siblings or the caller. A malformed input never panics or errors; it
    /// comes back as an `Invalid message to tell` error message, with no
    /// side effects.
    pub fn tell(&self, message: impl Into<Draft>) -> Message {
        self.tell_with(message, Payload::new(), Context::new())
    }

    /// [`Broker::tell`] with explicit payload and context defaults.
    pub fn tell_with(
        &self,
        message: impl Into<Draft>,
        payload: Payload,
        context: Context,
    ) -> Message {
        let event = match normalize(message, &payload, &context) {
            Ok(Some(event)) => event,
            Ok(None) | Err(_) => {
                return named_error_message(
                    &NamedError::new(BROKER_ERROR, "Invalid message to tell"),
                    &Context::new(),
                );
            }
        };
        self.fan_out(&event);
        event
    }

    /// Asks for a reply to the message and resolves to exactly one message,
    /// successful or error-shaped. This never returns an `Err` for
    /// handler-level failures.
    ///
    /// Matching handlers run sequentially in registry order; the first
    /// non-absent response wins and is side-broadcast (unless its context
    /// marks it `private`). The handlers that were not reached keep running
    /// afterward in their own tasks, their responses observable only as
    /// broadcasts. With no responder at all, the reply is a `No reply` error
    /// with status 404. The reply always carries `context.request`.
    pub async fn ask(&self, message: impl Into<Draft>) -> Message {
        self.ask_with(message, Payload::new(), Context::new()).await
    }

    /// [`Broker::ask`] with explicit payload and context defaults.
    pub async fn ask_with(
        &self,
        message: impl Into<Draft>,
        payload: Payload,
        context: Context,
    ) -> Message {
        let request = match normalize(message, &payload, &context) {
            Ok(Some(request)) => request,
            Ok(None) | Err(_) => {
                return self.throw(NamedError::new(BROKER_ERROR, "Invalid message to ask"));
            }
        };

        let handlers = self.handlers_for(&request.kind);
        debug!(kind = %request.kind, handlers = handlers.len(), "asking");

        let mut handlers = handlers.into_iter();
        let mut resolved: Option<Message> = None;
        for handler in handlers.by_ref() {
            let outcome = handler
                .call(
                    request.payload.clone(),
                    request.context.clone(),
                    request.kind.clone(),
                    self.messenger(),
                )
                .await
                .and_then(|returned| {
                    normalize(returned, &Payload::new(), &request.context).map_err(Into::into)
                });
            let response = match outcome {
                Ok(response) => response,
                Err(error) => Some(error_message(&error, 400, &request.context)),
            };

            if let Some(response) = response {
                if !response.is_private() {
                    self.tell(response.clone());
                }
                resolved = Some(response);
                break;
            }
        }

        // Handlers past the winner still get the request; their replies are
        // only ever observable as broadcasts.
        self.drain(&request, handlers);

        let mut reply = match resolved {
            Some(reply) => reply,
            None => self.tell(named_error_message(
                &NamedError::new(BROKER_ERROR, "No reply").with_status(404),
                &request.context,
            )),
        };
        reply
            .context
            .insert("request".into(), json!(request.kind));
        reply
    }

    /// Converts the error to a message and broadcasts it. Always a
    /// broadcast, never a reply; callers that want an answer use `ask`.
    pub fn throw(&self, error: impl Into<anyhow::Error>) -> Message {
        self.throw_with(error, 400, Context::new())
    }

    /// [`Broker::throw`] with explicit status and context.
    pub fn throw_with(
        &self,
        error: impl Into<anyhow::Error>,
        status: u16,
        context: Context,
    ) -> Message {
        self.tell(error_message(&error.into(), status, &context))
    }

    /// Broadcasts `LISTEN`. Transport adapters subscribe to it to start
    /// accepting traffic; the broker itself has no transport.
    pub fn listen(&self) {
        self.tell("LISTEN");
    }

    fn install(&self, subscriptions: Subscriptions) -> Result<Vec<String>> {
        let mut patterns = Vec::new();
        for (pattern, handler) in subscriptions.into_entries() {
            patterns.push(self.install_one(&pattern, handler)?);
        }
        Ok(patterns)
    }

    fn install_one(&self, pattern: &str, handler: Arc<dyn Handler>) -> Result<String> {
        let mut registry = self.registry.write().unwrap();
        registry.subscribe(pattern, handler)
    }

    fn announce(&self, patterns: Vec<String>, name: Option<&str>) {
        let mut event = Message::new("SUBSCRIBED").with("patterns", json!(patterns));
        if let Some(name) = name {
            event = event.with("name", json!(name));
        }
        self.tell(event);
    }

    fn handlers_for(&self, kind: &str) -> Vec<Arc<dyn Handler>> {
        self.registry.read().unwrap().handlers_for(kind)
    }

    fn fan_out(&self, event: &Message) {
        let handlers = self.handlers_for(&event.kind);
        debug!(kind = %event.kind, handlers = handlers.len(), "telling");
        for handler in handlers {
            let messenger = self.messenger();
            let event = event.clone();
            tokio::spawn(async move {
                // Fire-and-forget: outcomes of told handlers are nobody's
                // business but their own.
                let _ = handler
                    .call(event.payload, event.context, event.kind, messenger)
                    .await;
            });
        }
    }

    fn drain(&self, request: &Message, rest: impl Iterator<Item = Arc<dyn Handler>>) {
        for handler in rest {
            let broker = self.clone();
            let request = request.clone();
            tokio::spawn(async move {
                let outcome = handler
                    .call(
                        request.payload.clone(),
                        request.context.clone(),
                        request.kind.clone(),
                        broker.messenger(),
                    )
                    .await;
                if let Ok(returned) = outcome
                    && let Ok(Some(response)) =
                        normalize(returned, &Payload::new(), &request.context)
                    && !response.is_private()
                {
                    broker.tell(response);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HandlerResult, Response, handler_fn};
    use courier_proto::is_error;

    fn decline() -> impl Handler {
        handler_fn(|_p, _c, _k, _m| async { Ok(None) as HandlerResult })
    }

    #[tokio::test]
    async fn test_subscribe_rejects_bad_patterns() {
        let broker = Broker::new();
        assert!(broker.subscribe("", decline()).is_err());
        assert!(broker.subscribe("GET:[USER", decline()).is_err());
    }

    #[tokio::test]
    async fn test_tell_returns_normalized_event() {
        let broker = Broker::new();
        let event = broker.tell_with(
            "greet",
            Payload::from_iter([("name".to_string(), json!("Ada"))]),
            Context::new(),
        );
        assert_eq!(event.kind, "GREET");
        assert_eq!(event.payload.get("name"), Some(&json!("Ada")));
    }

    #[tokio::test]
    async fn test_tell_with_empty_kind_is_an_error_message() {
        let broker = Broker::new();
        let event = broker.tell("");
        assert_eq!(event.kind, "COURIER_ERROR");
        assert_eq!(
            event.payload.get("error"),
            Some(&json!("Invalid message to tell"))
        );
        assert!(is_error(&event));
    }

    #[tokio::test]
    async fn test_ask_with_absent_message_is_an_error_message() {
        let broker = Broker::new();
        let none: Option<Message> = None;
        let reply = broker.ask(none).await;
        assert_eq!(reply.kind, "COURIER_ERROR");
        assert_eq!(
            reply.payload.get("error"),
            Some(&json!("Invalid message to ask"))
        );
    }

    #[tokio::test]
    async fn test_ask_without_handlers_is_404() {
        let broker = Broker::new();
        let reply = broker.ask("MISSING").await;
        assert!(is_error(&reply));
        assert_eq!(reply.status(), Some(404));
        assert_eq!(reply.request(), Some("MISSING"));
    }

    #[tokio::test]
    async fn test_ask_returns_first_response() {
        let broker = Broker::new();
        broker
            .subscribe("PING", handler_fn(|_p, _c, _k, _m| async {
                Ok(Some(Response::from("PONG")))
            }))
            .unwrap();
        let reply = broker.ask("ping").await;
        assert_eq!(reply.kind, "PONG");
        assert_eq!(reply.request(), Some("PING"));
    }

    #[tokio::test]
    async fn test_register_factory_and_list() {
        let broker = Broker::new();
        broker
            .register(vec![
                Registrant::from(Subscriptions::new().on("A", decline())),
                Registrant::factory(|| Registrant::from(Subscriptions::new().on("B", decline()))),
            ])
            .unwrap();
        assert_eq!(broker.registry.read().unwrap().pattern_count(), 2);
    }
}
