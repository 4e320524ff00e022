//! Error types and the error-to-message codec.
//!
//! Handler failures become first-class messages so that callers of `ask`
//! never have to catch anything: the codec turns any error into an
//! `*ERROR`-kinded message carrying the text and an HTTP-style status.

use serde_json::json;
use thiserror::Error;

use crate::message::{Context, Message, Payload};
use crate::pattern::{Probe, matches};

/// Errors raised by the broker's validation paths.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("invalid subscription: {0}")]
    InvalidSubscription(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// An error value carrying a name, an HTTP-style status, and context fields.
///
/// Every distinct name is its own error kind for matching and telemetry: the
/// codec derives the message kind from it (`BadInput` becomes `BAD_INPUT`),
/// so handlers can subscribe to exactly the failures they care about.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct NamedError {
    /// Error-class tag, usually CamelCase.
    pub name: String,
    /// Human-readable description.
    pub message: String,
    /// HTTP-style status code.
    pub status: u16,
    /// Context fields merged into the error message's context.
    pub context: Context,
}

impl NamedError {
    /// Creates a named error with status 400 and empty context.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            status: 400,
            context: Context::new(),
        }
    }

    /// Sets the status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Sets the context fields.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }
}

/// Converts an error into a well-formed error message.
///
/// A [`NamedError`] anywhere in the chain keeps its own name, status, and
/// context; any other error becomes a plain `ERROR` with the given status.
pub fn error_message(error: &anyhow::Error, status: u16, context: &Context) -> Message {
    match error.downcast_ref::<NamedError>() {
        Some(named) => named_error_message(named, context),
        None => error_text(&error.to_string(), status, context),
    }
}

/// Error message from a [`NamedError`] directly.
///
/// The kind is the SCREAMING_SNAKE_CASE of the error's name; the error's own
/// context fields win over the passed defaults on conflict.
pub fn named_error_message(error: &NamedError, context: &Context) -> Message {
    let mut merged = context.clone();
    merged.extend(error.context.clone());
    Message {
        kind: screaming_snake(&error.name),
        payload: error_payload(&error.message, error.status),
        context: merged,
    }
}

/// Error message from plain text: kind `ERROR`, the text in `payload.error`.
pub fn error_text(error: &str, status: u16, context: &Context) -> Message {
    Message {
        kind: "ERROR".into(),
        payload: error_payload(error, status),
        context: context.clone(),
    }
}

/// True if the probe's kind matches `*ERROR`.
pub fn is_error<'a>(probe: impl Into<Probe<'a>>) -> bool {
    matches(probe, "*ERROR")
}

fn error_payload(error: &str, status: u16) -> Payload {
    let mut payload = Payload::new();
    payload.insert("error".into(), json!(error));
    payload.insert("status".into(), json!(status));
    payload
}

/// `BadInput` → `BAD_INPUT`, `HTTPError` → `HTTP_ERROR`, `No reply` → `NO_REPLY`.
fn screaming_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
            continue;
        }
        if c.is_uppercase() && i > 0 && !out.is_empty() && !out.ends_with('_') {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|next| next.is_lowercase());
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_is_lower) {
                out.push('_');
            }
        }
        out.push(c.to_ascii_uppercase());
    }
    out.trim_end_matches('_').to_string()
}
