//! The capability façade handed to every handler.
//!
//! A [`Messenger`] exposes the messaging operations of a broker and only
//! those: no registration, no listen hook. Every handler receives one as its
//! fourth argument; services receive one when they register. Handler code is
//! written against this handle, never against a concrete broker.

use courier_proto::{
    Context, Draft, Message, Payload, Probe, Result, error_message, is_error, matches, normalize,
};

use crate::broker::Broker;

/// Messaging capabilities bound to one broker.
///
/// Cloning is cheap; clones address the same broker.
#[derive(Clone)]
pub struct Messenger {
    broker: Broker,
}

impl Messenger {
    pub(crate) fn new(broker: Broker) -> Self {
        Self { broker }
    }

    /// Asks for a reply. See [`Broker::ask`].
    pub async fn ask(&self, message: impl Into<Draft>) -> Message {
        self.broker.ask(message).await
    }

    /// Asks with explicit payload and context defaults.
    pub async fn ask_with(
        &self,
        message: impl Into<Draft>,
        payload: Payload,
        context: Context,
    ) -> Message {
        self.broker.ask_with(message, payload, context).await
    }

    /// Broadcasts without waiting. See [`Broker::tell`].
    pub fn tell(&self, message: impl Into<Draft>) -> Message {
        self.broker.tell(message)
    }

    /// Broadcasts with explicit payload and context defaults.
    pub fn tell_with(
        &self,
        message: impl Into<Draft>,
        payload: Payload,
        context: Context,
    ) -> Message {
        self.broker.tell_with(message, payload, context)
    }

    /// Converts the error to a message and broadcasts it.
    pub fn throw(&self, error: impl Into<anyhow::Error>) -> Message {
        self.broker.throw(error)
    }

    /// [`Messenger::throw`] with explicit status and context.
    pub fn throw_with(
        &self,
        error: impl Into<anyhow::Error>,
        status: u16,
        context: Context,
    ) -> Message {
        self.broker.throw_with(error, status, context)
    }

    /// Normalizes a loose input into a complete message.
    pub fn msg(
        &self,
        message: impl Into<Draft>,
        payload: &Payload,
        context: &Context,
    ) -> Result<Option<Message>> {
        normalize(message, payload, context)
    }

    /// Tests a kind or message against a pattern.
    pub fn matches<'a>(&self, probe: impl Into<Probe<'a>>, pattern: &str) -> bool {
        matches(probe, pattern)
    }

    /// Builds an error message without broadcasting it.
    pub fn error(&self, error: impl Into<anyhow::Error>, status: u16, context: &Context) -> Message {
        error_message(&error.into(), status, context)
    }

    /// True if the probe's kind matches `*ERROR`.
    pub fn is_error<'a>(&self, probe: impl Into<Probe<'a>>) -> bool {
        is_error(probe)
    }
}
