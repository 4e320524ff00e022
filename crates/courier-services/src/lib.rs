//! # courier-services
//!
//! Optional collaborator services for the courier broker. These are ordinary
//! registrants; the core neither knows nor cares about them.

mod logger;

pub use logger::Logger;
