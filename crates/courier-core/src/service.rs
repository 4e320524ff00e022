//! Registrable services.
//!
//! `register` accepts an explicit tagged union of shapes instead of probing
//! values at runtime: a plain pattern→handler map, a service instance, a
//! factory, or a list of those. A service consumes itself at registration
//! time and receives the broker's [`Messenger`], which replaces the dynamic
//! capability mixin of looser designs: anything the service wants to keep
//! calling later, it keeps the messenger for.

use std::sync::Arc;

use crate::handler::Handler;
use crate::messenger::Messenger;

/// Ordered pattern → handler subscriptions, built by services and handler
/// maps. Order is preserved all the way into the registry.
#[derive(Default)]
pub struct Subscriptions {
    entries: Vec<(String, Arc<dyn Handler>)>,
}

impl Subscriptions {
    /// Creates an empty subscription set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler for the pattern.
    pub fn on(mut self, pattern: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.entries.push((pattern.into(), Arc::new(handler)));
        self
    }

    /// Appends an already-shared handler for the pattern.
    pub fn on_arc(mut self, pattern: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        self.entries.push((pattern.into(), handler));
        self
    }

    /// True if no handlers were added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(String, Arc<dyn Handler>)> {
        self.entries
    }
}

/// A bundle of handlers registered as one unit.
///
/// `subscribe` consumes the service and hands it the messenger; whatever
/// state the handlers share, the service arranges before returning its
/// subscriptions (usually by moving itself into an `Arc` its closures
/// capture).
pub trait Service: Send + 'static {
    /// Name carried in the batched `SUBSCRIBED` broadcast.
    fn name(&self) -> &'static str;

    /// Binds the service to a broker and returns its subscriptions.
    fn subscribe(self: Box<Self>, messenger: Messenger) -> Subscriptions;
}

/// The shapes `register` accepts.
pub enum Registrant {
    /// A plain pattern → handler map.
    Handlers(Subscriptions),
    /// A service instance.
    Service(Box<dyn Service>),
    /// A zero-argument factory, called at registration time.
    Factory(Box<dyn FnOnce() -> Registrant + Send>),
    /// Several registrants, registered in order.
    List(Vec<Registrant>),
}

impl Registrant {
    /// Wraps a service instance.
    pub fn service(service: impl Service) -> Self {
        Self::Service(Box::new(service))
    }

    /// Wraps a factory.
    pub fn factory(factory: impl FnOnce() -> Registrant + Send + 'static) -> Self {
        Self::Factory(Box::new(factory))
    }
}

impl From<Subscriptions> for Registrant {
    fn from(subscriptions: Subscriptions) -> Self {
        Self::Handlers(subscriptions)
    }
}

impl From<Vec<Registrant>> for Registrant {
    fn from(registrants: Vec<Registrant>) -> Self {
        Self::List(registrants)
    }
}
