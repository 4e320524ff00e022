//! # courier-core
//!
//! The courier broker: pattern-addressed, in-process messaging between
//! services that never hold references to each other.
//!
//! This crate provides:
//! - The [`Broker`] with its `ask` (request/reply) and `tell` (broadcast)
//!   dispatch protocols
//! - The subscription [`Registry`] mapping patterns to ordered handler lists
//! - [`Handler`] and [`Service`] traits plus the [`Registrant`] shapes
//!   accepted by `register`
//! - The [`Messenger`] capability façade passed to every handler
//!
//! ```ignore
//! let broker = Broker::new();
//! broker.subscribe("GET:USER", handler_fn(|payload, _ctx, _kind, _messenger| async move {
//!     Ok(Some(Message::new("USER").with("name", json!("Ada")).into()))
//! }))?;
//! let reply = broker.ask_with("GET:USER", payload, Context::new()).await;
//! ```

mod broker;
mod handler;
mod messenger;
mod registry;
mod service;

pub use broker::Broker;
pub use handler::{FnHandler, Handler, HandlerResult, Response, handler_fn};
pub use messenger::Messenger;
pub use registry::Registry;
pub use service::{Registrant, Service, Subscriptions};

pub use courier_proto::{
    Context, Draft, Error, Message, NamedError, Payload, Pattern, Probe, Result, error_message,
    error_text, is_error, matches, normalize,
};
