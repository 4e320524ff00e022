//! Console logger service.
//!
//! Subscribes to the broker's well-known kinds and renders everything that
//! flows past through `tracing`. A pure observer: every handler declines, so
//! it never wins an `ask`.

use serde_json::Value;
use tracing::{error, info};

use courier_core::{
    Context, HandlerResult, Messenger, Payload, Service, Subscriptions, handler_fn, is_error,
};

/// Logs broker traffic: subscriptions, responses, `LOG` lines, errors, and
/// (through a negated catch-all) every other message kind exactly once.
#[derive(Debug, Default)]
pub struct Logger;

impl Logger {
    /// Creates the logger service.
    pub fn new() -> Self {
        Self
    }
}

impl Service for Logger {
    fn name(&self) -> &'static str {
        "Logger"
    }

    fn subscribe(self: Box<Self>, _messenger: Messenger) -> Subscriptions {
        Subscriptions::new()
            .on("SUBSCRIBED", handler_fn(log_subscription))
            .on("RESPONSE", handler_fn(log_response))
            .on("LOG", handler_fn(log_line))
            .on("*ERROR", handler_fn(log_error))
            .on(
                "*|!*ERROR|!SUBSCRIBED|!RESPONSE|!LOG",
                handler_fn(log_message),
            )
    }
}

async fn log_subscription(
    payload: Payload,
    _context: Context,
    kind: String,
    _messenger: Messenger,
) -> HandlerResult {
    let patterns = payload
        .get("patterns")
        .and_then(Value::as_array)
        .map(|patterns| {
            patterns
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    match payload.get("name").and_then(Value::as_str) {
        Some(name) => info!(kind = %kind, service = name, "subscribed {patterns}"),
        None => info!(kind = %kind, "subscribed {patterns}"),
    }
    Ok(None)
}

async fn log_response(
    payload: Payload,
    _context: Context,
    kind: String,
    _messenger: Messenger,
) -> HandlerResult {
    let replied = payload.get("kind").and_then(Value::as_str).unwrap_or("?");
    if is_error(replied) {
        error!(kind = %kind, "{replied}");
    } else {
        info!(kind = %kind, "{replied}");
    }
    Ok(None)
}

async fn log_line(
    payload: Payload,
    _context: Context,
    _kind: String,
    _messenger: Messenger,
) -> HandlerResult {
    let message = payload.get("message").and_then(Value::as_str).unwrap_or("?");
    info!("{message}");
    Ok(None)
}

async fn log_error(
    payload: Payload,
    _context: Context,
    kind: String,
    _messenger: Messenger,
) -> HandlerResult {
    let text = payload.get("error").and_then(Value::as_str).unwrap_or("?");
    let status = payload.get("status").and_then(Value::as_u64);
    match status {
        Some(status) => error!(kind = %kind, status, "{text}"),
        None => error!(kind = %kind, "{text}"),
    }
    Ok(None)
}

async fn log_message(
    payload: Payload,
    _context: Context,
    kind: String,
    _messenger: Messenger,
) -> HandlerResult {
    info!(kind = %kind, "{}", render(&payload));
    Ok(None)
}

/// Compact one-line payload rendering: values are abbreviated to their
/// shape, not dumped.
fn render(payload: &Payload) -> String {
    payload
        .iter()
        .map(|(key, value)| format!("{key}: {}", repr(value)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn repr(value: &Value) -> String {
    match value {
        Value::Null => "?".into(),
        Value::Array(items) => format!("[{}]", ".".repeat(items.len())),
        Value::Object(map) => {
            let keys = map.keys().cloned().collect::<Vec<_>>().join(" ");
            format!("{{ {keys} }}")
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{Broker, Pattern, Registrant};
    use serde_json::json;

    #[test]
    fn test_catch_all_excludes_logged_kinds() {
        let pattern = Pattern::compile("*|!*ERROR|!SUBSCRIBED|!RESPONSE|!LOG").unwrap();
        assert!(pattern.matches("GREET"));
        assert!(pattern.matches("GET:USER"));
        assert!(!pattern.matches("LOG"));
        assert!(!pattern.matches("RESPONSE"));
        assert!(!pattern.matches("SUBSCRIBED"));
        assert!(!pattern.matches("ERROR"));
        assert!(!pattern.matches("COURIER_ERROR"));
    }

    #[test]
    fn test_repr_abbreviates_values() {
        assert_eq!(repr(&json!(null)), "?");
        assert_eq!(repr(&json!([1, 2, 3])), "[...]");
        assert_eq!(repr(&json!({"a": 1, "b": 2})), "{ a b }");
        assert_eq!(repr(&json!("text")), "\"text\"");
        assert_eq!(repr(&json!(7)), "7");
    }

    #[test]
    fn test_render_joins_fields() {
        let payload = match json!({"id": 1, "tags": ["x"]}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        assert_eq!(render(&payload), "id: 1, tags: [.]");
    }

    #[tokio::test]
    async fn test_logger_registers_and_stays_quiet() {
        let broker = Broker::new();
        broker.register(Registrant::service(Logger::new())).unwrap();

        // The logger only observes; an ask it alone matches resolves to the
        // 404 no-reply error.
        let reply = broker.ask("ANYTHING").await;
        assert_eq!(reply.status(), Some(404));
    }
}
