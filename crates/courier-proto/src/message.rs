//! The message value and its normalization rules.
//!
//! Every unit of communication is a `{kind, payload, context}` triple.
//! Normalization turns the loose inputs callers hand to `ask`/`tell` into
//! complete, owned messages, so handlers never share mutable state through a
//! message they were given.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Payload fields of a message.
pub type Payload = Map<String, Value>;

/// Context fields of a message.
pub type Context = Map<String, Value>;

/// A pattern-addressed message.
///
/// The kind is an upper-case identifier (`GET:USER`, `SUBSCRIBED`, ...);
/// payload and context are always present, defaulting to empty maps. A
/// message is never mutated after creation; the one exception is the
/// dispatcher stamping `context.request` onto the reply it resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Canonical upper-case message kind. Never empty.
    pub kind: String,
    /// Data carried by the message.
    #[serde(default)]
    pub payload: Payload,
    /// Metadata threaded along with the message (reply routing, privacy).
    #[serde(default)]
    pub context: Context,
}

impl Message {
    /// Creates a message of the given kind with empty payload and context.
    ///
    /// The kind is trimmed and upper-cased.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into().trim().to_uppercase(),
            payload: Payload::new(),
            context: Context::new(),
        }
    }

    /// Replaces the payload.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Replaces the context.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Inserts a single payload field.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Inserts a single context field.
    pub fn with_ctx(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// The `status` payload field, if present (error messages carry one).
    pub fn status(&self) -> Option<u64> {
        self.payload.get("status").and_then(Value::as_u64)
    }

    /// The kind of the request this message answers, if it is a reply.
    pub fn request(&self) -> Option<&str> {
        self.context.get("request").and_then(Value::as_str)
    }

    /// True if `context.private` is set to a truthy value.
    ///
    /// A private reply is returned to the asker but not side-broadcast.
    pub fn is_private(&self) -> bool {
        self.context.get("private").is_some_and(truthy)
    }
}

/// A message-like input before normalization: a full message, a bare kind
/// string, or nothing at all.
#[derive(Debug, Clone)]
pub enum Draft {
    /// No message. Normalizes to `None` without error.
    None,
    /// A bare kind; payload and context come from the defaults.
    Kind(String),
    /// An already-shaped message; its own fields win over the defaults.
    Message(Message),
}

impl From<&str> for Draft {
    fn from(kind: &str) -> Self {
        Self::Kind(kind.to_string())
    }
}

impl From<String> for Draft {
    fn from(kind: String) -> Self {
        Self::Kind(kind)
    }
}

impl From<Message> for Draft {
    fn from(message: Message) -> Self {
        Self::Message(message)
    }
}

impl<T: Into<Draft>> From<Option<T>> for Draft {
    fn from(input: Option<T>) -> Self {
        match input {
            Some(value) => value.into(),
            None => Self::None,
        }
    }
}

/// Produces a complete message from a loose input.
///
/// - [`Draft::None`] propagates as `Ok(None)`: "no message" is not an error
///   here; `ask`/`tell` decide what it means for them.
/// - A bare kind becomes a message with copies of the default payload and
///   context.
/// - A full message keeps its own payload/context entries; the defaults only
///   fill the gaps.
///
/// Fails with [`Error::InvalidMessage`] when the kind is empty or blank.
/// Normalizing an already-normalized message with empty defaults is a no-op.
pub fn normalize(
    message: impl Into<Draft>,
    payload: &Payload,
    context: &Context,
) -> Result<Option<Message>> {
    match message.into() {
        Draft::None => Ok(None),
        Draft::Kind(kind) => {
            let kind = kind.trim().to_uppercase();
            if kind.is_empty() {
                return Err(Error::InvalidMessage("message kind is empty".into()));
            }
            Ok(Some(Message {
                kind,
                payload: payload.clone(),
                context: context.clone(),
            }))
        }
        Draft::Message(message) => {
            let kind = message.kind.trim().to_uppercase();
            if kind.is_empty() {
                return Err(Error::InvalidMessage("message kind is empty".into()));
            }
            let mut merged_payload = payload.clone();
            merged_payload.extend(message.payload);
            let mut merged_context = context.clone();
            merged_context.extend(message.context);
            Ok(Some(Message {
                kind,
                payload: merged_payload,
                context: merged_context,
            }))
        }
    }
}

/// JavaScript-style truthiness for context flags.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_none_or(|f| f != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_normalize_bare_kind() {
        let message = normalize("get:user", &Payload::new(), &Context::new())
            .unwrap()
            .unwrap();
        assert_eq!(message.kind, "GET:USER");
        assert!(message.payload.is_empty());
        assert!(message.context.is_empty());
    }

    #[test]
    fn test_normalize_attaches_defaults_to_bare_kind() {
        let payload = fields(json!({"id": 1}));
        let context = fields(json!({"trace": "abc"}));
        let message = normalize("PING", &payload, &context).unwrap().unwrap();
        assert_eq!(message.payload, payload);
        assert_eq!(message.context, context);
    }

    #[test]
    fn test_normalize_none_propagates() {
        let draft: Option<Message> = None;
        let result = normalize(draft, &Payload::new(), &Context::new()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_normalize_rejects_empty_kind() {
        assert!(normalize("", &Payload::new(), &Context::new()).is_err());
        assert!(normalize("   ", &Payload::new(), &Context::new()).is_err());
        assert!(normalize(Message::new(""), &Payload::new(), &Context::new()).is_err());
    }

    #[test]
    fn test_message_fields_win_over_defaults() {
        let message = Message::new("USER").with("id", json!(2));
        let defaults = fields(json!({"id": 1, "page": 3}));
        let merged = normalize(message, &defaults, &Context::new())
            .unwrap()
            .unwrap();
        assert_eq!(merged.payload.get("id"), Some(&json!(2)));
        assert_eq!(merged.payload.get("page"), Some(&json!(3)));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let original = Message::new("greet")
            .with("name", json!("Ada"))
            .with_ctx("trace", json!("t1"));
        let once = normalize(original, &Payload::new(), &Context::new())
            .unwrap()
            .unwrap();
        let twice = normalize(once.clone(), &Payload::new(), &Context::new())
            .unwrap()
            .unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalized_copies_are_independent() {
        let defaults = fields(json!({"shared": true}));
        let mut first = normalize("A", &defaults, &Context::new()).unwrap().unwrap();
        first.payload.insert("shared".into(), json!(false));
        let second = normalize("B", &defaults, &Context::new()).unwrap().unwrap();
        assert_eq!(second.payload.get("shared"), Some(&json!(true)));
    }

    #[test]
    fn test_is_private() {
        assert!(Message::new("X").with_ctx("private", json!(true)).is_private());
        assert!(Message::new("X").with_ctx("private", json!(1)).is_private());
        assert!(!Message::new("X").with_ctx("private", json!(false)).is_private());
        assert!(!Message::new("X").with_ctx("private", json!(0)).is_private());
        assert!(!Message::new("X").with_ctx("private", json!("")).is_private());
        assert!(!Message::new("X").is_private());
    }

    #[test]
    fn test_status_accessor() {
        let message = Message::new("ERROR").with("status", json!(404));
        assert_eq!(message.status(), Some(404));
        assert_eq!(Message::new("OK").status(), None);
    }
}
