//! Subscription patterns.
//!
//! A pattern addresses message kinds with glob syntax. Alternatives are
//! separated by `|`, and a `!` prefix negates a segment: a kind matches when
//! it matches at least one plain segment and none of the negated ones. The
//! broker's own logger relies on this to subscribe to "everything except the
//! kinds I already print" (`*|!*ERROR|!SUBSCRIBED|!RESPONSE|!LOG`).

use std::fmt;

use globset::{Glob, GlobMatcher};

use crate::error::{Error, Result};
use crate::message::Message;

/// A compiled subscription pattern.
///
/// Compilation is idempotent and side-effect free; two patterns with the same
/// normalized text match the same kinds.
#[derive(Clone)]
pub struct Pattern {
    text: String,
    includes: Vec<GlobMatcher>,
    excludes: Vec<GlobMatcher>,
}

impl Pattern {
    /// Compiles a pattern string.
    ///
    /// Fails with [`Error::InvalidPattern`] when the pattern is empty, a
    /// segment is empty, or a segment is not valid glob syntax. Matching is
    /// case-insensitive: the pattern is upper-cased here, probes are
    /// upper-cased in [`Pattern::matches`].
    pub fn compile(pattern: &str) -> Result<Self> {
        let text = pattern.trim().to_uppercase();
        if text.is_empty() {
            return Err(Error::InvalidPattern("pattern is empty".into()));
        }

        let mut includes = Vec::new();
        let mut excludes = Vec::new();
        for segment in text.split('|') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (negated, body) = match segment.strip_prefix('!') {
                Some(rest) => (true, rest.trim()),
                None => (false, segment),
            };
            if body.is_empty() {
                return Err(Error::InvalidPattern(format!(
                    "empty segment in `{text}`"
                )));
            }
            let matcher = Glob::new(body)
                .map_err(|source| Error::InvalidPattern(format!("`{body}`: {source}")))?
                .compile_matcher();
            if negated {
                excludes.push(matcher);
            } else {
                includes.push(matcher);
            }
        }

        Ok(Self {
            text,
            includes,
            excludes,
        })
    }

    /// The normalized (upper-cased, trimmed) pattern text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Tests a message kind against this pattern.
    pub fn matches(&self, kind: &str) -> bool {
        let kind = kind.to_uppercase();
        self.includes.iter().any(|glob| glob.is_match(&kind))
            && !self.excludes.iter().any(|glob| glob.is_match(&kind))
    }

    /// Tests a message against this pattern by its kind.
    pub fn matches_message(&self, message: &Message) -> bool {
        self.matches(&message.kind)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Pattern {}

/// Something a pattern can be tested against: a kind, a message, or nothing.
#[derive(Debug, Clone, Copy)]
pub enum Probe<'a> {
    /// Absent probe; matches nothing.
    None,
    /// A bare message kind.
    Kind(&'a str),
    /// A message, probed by its kind.
    Message(&'a Message),
}

impl<'a> From<&'a str> for Probe<'a> {
    fn from(kind: &'a str) -> Self {
        Self::Kind(kind)
    }
}

impl<'a> From<&'a String> for Probe<'a> {
    fn from(kind: &'a String) -> Self {
        Self::Kind(kind)
    }
}

impl<'a> From<&'a Message> for Probe<'a> {
    fn from(message: &'a Message) -> Self {
        Self::Message(message)
    }
}

impl<'a, T: Into<Probe<'a>>> From<Option<T>> for Probe<'a> {
    fn from(probe: Option<T>) -> Self {
        match probe {
            Some(value) => value.into(),
            None => Self::None,
        }
    }
}

/// One-shot pattern test.
///
/// Absent probes and uncompilable patterns match nothing; this never errors,
/// which is what the façade's `matches`/`is_error` helpers need.
pub fn matches<'a>(probe: impl Into<Probe<'a>>, pattern: &str) -> bool {
    let kind = match probe.into() {
        Probe::None => return false,
        Probe::Kind(kind) => kind,
        Probe::Message(message) => message.kind.as_str(),
    };
    match Pattern::compile(pattern) {
        Ok(compiled) => compiled.matches(kind),
        Err(_) => false,
    }
}
