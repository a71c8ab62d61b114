//! # mongo-log-sink-domain
//!
//! Log event, value, and document model for the MongoDB log sink.
//!
//! This crate contains the core domain model with no infrastructure dependencies:
//!
//! - **Values** - `LogValue`, `ScalarValue` (what log events carry)
//! - **Documents** - `Document`, `DocumentValue` (what gets stored)
//! - **Events** - `LogEvent`, `LogLevel`, `ExceptionInfo`, `MessageTemplate`
//! - **Records** - `LogRecord` and its stored field names
//! - **Naming** - `CollectionName`, `DatabaseName`, `RollingInterval`, field-name sanitization
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - No infrastructure or adapter dependencies
//! - Pure domain logic with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

// Re-export shared types for convenience
pub use mongo_log_sink_shared::shared_crate_version;

// =============================================================================
// DOMAIN MODULES
// =============================================================================

pub mod document;
pub mod event;
pub mod field_name;
pub mod primitives;
pub mod record;
pub mod rolling;
pub mod template;
pub mod value;

pub use document::{Document, DocumentValue};
pub use event::{ExceptionInfo, LogEvent, LogLevel};
pub use field_name::{NULL_FIELD_NAME, SanitizedFieldName, sanitize_field_name};
pub use primitives::{CollectionName, DatabaseName, PrimitiveError};
pub use record::{LogRecord, fields};
pub use rolling::{RollingInterval, RollingTarget, resolve_collection_name};
pub use template::{MessageTemplate, PropertyToken, TemplateToken};
pub use value::{LogValue, ScalarValue, format_duration};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_crate_compiles() {
        let version = domain_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn domain_depends_on_shared() {
        let shared_version = shared_crate_version();
        assert!(!shared_version.is_empty());
    }
}
