//! # mongo-log-sink-ports
//!
//! Port traits for the mongo-log-sink hexagonal architecture.
//!
//! This crate defines the interfaces between the sink's use-cases and the
//! infrastructure it talks to. It depends only on `domain` and `shared`.

use std::future::Future;
use std::pin::Pin;

/// Boxed future used by port traits.
///
/// Boundary traits are I/O-bound; one allocation per call is noise next to a
/// network round-trip.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod clock;
pub mod document_store;
pub mod logger;

pub use clock::*;
pub use document_store::*;
pub use logger::*;

// Re-export selected domain types used in port signatures, so adapter crates
// can implement ports without directly depending on `mongo-log-sink-domain`.
pub use mongo_log_sink_domain::{CollectionName, Document, DocumentValue};
