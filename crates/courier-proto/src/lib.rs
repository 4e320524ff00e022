//! # courier-proto
//!
//! Shared message model for the courier broker.
//!
//! This crate provides the foundational pieces used across all courier crates:
//! - The [`Message`] value and its normalization rules
//! - Compiled subscription [`Pattern`]s with glob and negation support
//! - The error codec that turns Rust errors into error messages

mod error;
mod message;
mod pattern;

pub use error::{Error, NamedError, Result, error_message, error_text, is_error, named_error_message};
pub use message::{Context, Draft, Message, Payload, normalize};
pub use pattern::{Pattern, Probe, matches};
