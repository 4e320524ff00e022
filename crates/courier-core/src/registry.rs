//! The subscription registry.
//!
//! Maps compiled patterns to ordered handler lists. Registration order is
//! the tie-break order `ask` uses to pick a first responder, so the registry
//! never reorders anything: patterns in subscription order, handlers in
//! append order within a pattern.

use std::sync::Arc;

use tracing::trace;

use courier_proto::{Error, Pattern, Result};

use crate::handler::Handler;

struct Slot {
    pattern: Pattern,
    handlers: Vec<Arc<dyn Handler>>,
}

/// Pattern → handlers mapping owned by one broker.
#[derive(Default)]
pub struct Registry {
    slots: Vec<Slot>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles (or reuses) the pattern and appends the handler to it.
    ///
    /// Returns the normalized pattern text. Fails with
    /// [`Error::InvalidSubscription`] for blank patterns and
    /// [`Error::InvalidPattern`] for unparseable ones.
    pub fn subscribe(&mut self, pattern: &str, handler: Arc<dyn Handler>) -> Result<String> {
        if pattern.trim().is_empty() {
            return Err(Error::InvalidSubscription(
                "subscription pattern is empty".into(),
            ));
        }
        let compiled = Pattern::compile(pattern)?;
        let text = compiled.text().to_string();

        match self.slots.iter_mut().find(|slot| slot.pattern == compiled) {
            Some(slot) => slot.handlers.push(handler),
            None => self.slots.push(Slot {
                pattern: compiled,
                handlers: vec![handler],
            }),
        }
        trace!(pattern = %text, "handler subscribed");
        Ok(text)
    }

    /// Every handler whose pattern matches the kind, in subscription order.
    pub fn handlers_for(&self, kind: &str) -> Vec<Arc<dyn Handler>> {
        self.slots
            .iter()
            .filter(|slot| slot.pattern.matches(kind))
            .flat_map(|slot| slot.handlers.iter().cloned())
            .collect()
    }

    /// Number of distinct patterns.
    pub fn pattern_count(&self) -> usize {
        self.slots.len()
    }

    /// Total number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.slots.iter().map(|slot| slot.handlers.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HandlerResult, handler_fn};
    use courier_proto::{Context, Payload};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tagged(tag: usize, hits: Arc<AtomicUsize>) -> Arc<dyn Handler> {
        Arc::new(handler_fn(move |_payload, _context, _kind, _messenger| {
            let hits = hits.clone();
            async move {
                hits.store(tag, Ordering::SeqCst);
                Ok(None) as HandlerResult
            }
        }))
    }

    fn noop() -> Arc<dyn Handler> {
        Arc::new(handler_fn(|_payload, _context, _kind, _messenger| async {
            Ok(None) as HandlerResult
        }))
    }

    #[test]
    fn test_rejects_blank_pattern() {
        let mut registry = Registry::new();
        assert!(matches!(
            registry.subscribe("  ", noop()),
            Err(Error::InvalidSubscription(_))
        ));
    }

    #[test]
    fn test_reuses_slot_for_same_pattern_text() {
        let mut registry = Registry::new();
        registry.subscribe("get:user", noop()).unwrap();
        registry.subscribe("GET:USER", noop()).unwrap();
        assert_eq!(registry.pattern_count(), 1);
        assert_eq!(registry.handler_count(), 2);
    }

    #[test]
    fn test_handlers_for_preserves_registration_order() {
        let mut registry = Registry::new();
        registry.subscribe("GET:*", noop()).unwrap();
        registry.subscribe("*:USER", noop()).unwrap();
        registry.subscribe("GET:*", noop()).unwrap();

        // GET:USER matches both patterns: GET:* first (two handlers), then *:USER.
        let matched = registry.handlers_for("GET:USER");
        assert_eq!(matched.len(), 3);
        assert_eq!(registry.handlers_for("GET:POST").len(), 2);
        assert_eq!(registry.handlers_for("PUT:USER").len(), 1);
        assert!(registry.handlers_for("DELETE:POST").is_empty());
    }

    #[tokio::test]
    async fn test_handlers_for_returns_callable_handlers() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();
        registry.subscribe("PING", tagged(7, hits.clone())).unwrap();

        let broker = crate::broker::Broker::new();
        for handler in registry.handlers_for("PING") {
            handler
                .call(Payload::new(), Context::new(), "PING".into(), broker.messenger())
                .await
                .unwrap();
        }
        assert_eq!(hits.load(Ordering::SeqCst), 7);
    }
}
