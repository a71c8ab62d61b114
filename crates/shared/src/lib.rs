//! # mongo-log-sink-shared
//!
//! Shared result types, error envelopes, and request context for the
//! mongo-log-sink workspace.
//!
//! - Result and error envelope types
//! - Request context with correlation id and cancellation
//! - Bounded numeric wrappers and secret redaction helpers
//!
//! ## Design Principles
//!
//! 1. **No workspace dependencies** - This crate only depends on external crates
//! 2. **Serde-compatible** - Error envelopes serialize for diagnostics

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod bounds;
pub mod context;
pub mod errors;
pub mod redaction;
pub mod result;
pub mod timeout;

pub use bounds::{BoundedU32, BoundedU64, BoundsError};
pub use context::{CorrelationId, RequestContext};
pub use errors::{ErrorClass, ErrorCode, ErrorEnvelope, ErrorKind, ErrorMetadata, REDACTED_VALUE};
pub use redaction::{REDACTED, SecretString, is_secret_key, redact_if_secret};
pub use result::{Result, ResultExt};
pub use timeout::{run_cancellable, timeout_with_context};
pub use tokio_util::sync::CancellationToken;

/// Returns the shared crate version.
#[must_use]
pub const fn shared_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
