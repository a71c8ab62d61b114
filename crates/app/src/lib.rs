//! # mongo-log-sink-app
//!
//! Sink logic: value and document sanitization, event mapping, rolling
//! collection naming, schema reconciliation, and batch emission.
//! This crate depends on `ports`, `domain`, and `shared`.

pub mod collection_namer;
pub mod document_sanitizer;
pub mod entry_mapper;
pub mod exception_serializer;
pub mod legacy_formatter;
pub mod schema_reconciler;
pub mod sink;
pub mod value_sanitizer;

pub use collection_namer::CollectionNamer;
pub use document_sanitizer::sanitize_document;
pub use entry_mapper::EntryMapper;
pub use exception_serializer::{ExceptionFieldMap, ExceptionSerializer};
pub use legacy_formatter::{LegacyFormatter, legacy_fields};
pub use schema_reconciler::{
    CollectionOutcome, TTL_INDEX_NAME, TtlIndexOutcome, ensure_collection, ensure_ttl_index,
};
pub use sink::{DocumentShape, LogSink, LogSinkOptions, StoreSource};
pub use value_sanitizer::{KeyCollisionPolicy, ValueSanitizer};

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongo_log_sink_domain::domain_crate_version;
    use mongo_log_sink_ports::ports_crate_version;
    use mongo_log_sink_shared::shared_crate_version;

    #[test]
    fn app_crate_compiles() {
        let version = app_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn app_can_use_ports_domain_shared() {
        let ports_version = ports_crate_version();
        let domain_version = domain_crate_version();
        let shared_version = shared_crate_version();

        assert!(!ports_version.is_empty());
        assert!(!domain_version.is_empty());
        assert!(!shared_version.is_empty());
    }
}
