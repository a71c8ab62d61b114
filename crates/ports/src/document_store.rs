//! Document store boundary contract.
//!
//! Mirrors the small slice of a document database driver the sink needs:
//! collection listing and creation, index listing/creation/removal, and bulk
//! insert. Server-side conditions are reported as `ErrorEnvelope`s in the
//! `store` namespace whose code is the server's code name, with the numeric
//! code in the `server_code` metadata entry. Callers discriminate with
//! [`StoreErrorCode::matches`], never by message text.

use crate::BoxFuture;
use mongo_log_sink_domain::{CollectionName, Document};
use mongo_log_sink_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result};
use std::sync::Arc;
use std::time::Duration;

/// Error code namespace for store failures.
pub const STORE_ERROR_NAMESPACE: &str = "store";

/// Metadata key holding the numeric server code.
pub const SERVER_CODE_METADATA: &str = "server_code";

/// Server conditions the sink reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorCode {
    /// Collection does not exist (26).
    NamespaceNotFound,
    /// Index does not exist (27).
    IndexNotFound,
    /// Collection already exists (48).
    NamespaceExists,
    /// Identical index already exists under a different request (68).
    IndexAlreadyExists,
    /// Index with the same name exists with different options (85).
    IndexOptionsConflict,
    /// Index with the same name exists with a different key (86).
    IndexKeySpecsConflict,
}

impl StoreErrorCode {
    /// Code name as reported by the server.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NamespaceNotFound => "NamespaceNotFound",
            Self::IndexNotFound => "IndexNotFound",
            Self::NamespaceExists => "NamespaceExists",
            Self::IndexAlreadyExists => "IndexAlreadyExists",
            Self::IndexOptionsConflict => "IndexOptionsConflict",
            Self::IndexKeySpecsConflict => "IndexKeySpecsConflict",
        }
    }

    /// Numeric server code.
    #[must_use]
    pub const fn server_code(self) -> i32 {
        match self {
            Self::NamespaceNotFound => 26,
            Self::IndexNotFound => 27,
            Self::NamespaceExists => 48,
            Self::IndexAlreadyExists => 68,
            Self::IndexOptionsConflict => 85,
            Self::IndexKeySpecsConflict => 86,
        }
    }

    /// Look up a known code by number.
    #[must_use]
    pub fn from_server_code(code: i32) -> Option<Self> {
        [
            Self::NamespaceNotFound,
            Self::IndexNotFound,
            Self::NamespaceExists,
            Self::IndexAlreadyExists,
            Self::IndexOptionsConflict,
            Self::IndexKeySpecsConflict,
        ]
        .into_iter()
        .find(|known| known.server_code() == code)
    }

    /// Error code for envelopes.
    #[must_use]
    pub fn error_code(self) -> ErrorCode {
        ErrorCode::new(STORE_ERROR_NAMESPACE, self.name())
    }

    /// Build an envelope for this condition.
    pub fn to_error(self, message: impl Into<String>) -> ErrorEnvelope {
        server_error(self.server_code(), Some(self.name()), message)
    }

    /// Returns true when `error` reports this condition, by code name or number.
    #[must_use]
    pub fn matches(self, error: &ErrorEnvelope) -> bool {
        if error.code.namespace() != STORE_ERROR_NAMESPACE {
            return false;
        }
        error.code.code() == self.name()
            || error
                .metadata_value(SERVER_CODE_METADATA)
                .and_then(|value| value.parse::<i32>().ok())
                == Some(self.server_code())
    }
}

/// Build a `store` envelope from a server-reported code.
///
/// Unknown numbers without a name become `store:server_error`.
pub fn server_error(
    server_code: i32,
    code_name: Option<&str>,
    message: impl Into<String>,
) -> ErrorEnvelope {
    let code = code_name
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .or_else(|| StoreErrorCode::from_server_code(server_code).map(|known| known.name().to_owned()))
        .unwrap_or_else(|| "server_error".to_owned());
    ErrorEnvelope::expected_with_class(
        ErrorCode::new(STORE_ERROR_NAMESPACE, code),
        message,
        ErrorClass::NonRetriable,
    )
    .with_metadata(SERVER_CODE_METADATA, server_code.to_string())
}

/// Provider descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreProviderInfo {
    /// Stable provider identifier.
    pub id: Box<str>,
    /// Human-readable provider name.
    pub name: Box<str>,
}

/// Size limits for a capped collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CappedCollectionOptions {
    /// Maximum collection size in bytes.
    pub max_size_bytes: u64,
    /// Optional maximum number of documents.
    pub max_documents: Option<u64>,
}

/// Options for collection creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateCollectionOptions {
    /// Create as a capped collection.
    pub capped: Option<CappedCollectionOptions>,
}

/// Single-field index definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Index name.
    pub name: Box<str>,
    /// Indexed field.
    pub field: Box<str>,
    /// Ascending when true.
    pub ascending: bool,
    /// TTL: documents expire this long after the indexed date.
    pub expire_after: Option<Duration>,
}

/// An existing index as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    /// Index name.
    pub name: Box<str>,
    /// Indexed fields with direction (`1` / `-1`).
    pub keys: Vec<(Box<str>, i32)>,
    /// TTL setting, if any.
    pub expire_after: Option<Duration>,
}

/// Bulk insert options passed through to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertManyOptions {
    /// Stop at the first failed document.
    pub ordered: bool,
    /// Skip server-side schema validation.
    pub bypass_document_validation: bool,
}

impl Default for InsertManyOptions {
    fn default() -> Self {
        Self {
            ordered: true,
            bypass_document_validation: false,
        }
    }
}

/// Boundary contract for the document store.
pub trait DocumentStorePort: Send + Sync {
    /// Provider info for this implementation.
    fn provider(&self) -> &StoreProviderInfo;

    /// List collection names, optionally filtered to an exact name.
    fn list_collection_names(
        &self,
        ctx: &RequestContext,
        name_filter: Option<CollectionName>,
    ) -> BoxFuture<'_, Result<Vec<CollectionName>>>;

    /// Create a collection. Fails with `NamespaceExists` when present.
    fn create_collection(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
        options: CreateCollectionOptions,
    ) -> BoxFuture<'_, Result<()>>;

    /// List indexes on a collection.
    fn list_indexes(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
    ) -> BoxFuture<'_, Result<Vec<IndexInfo>>>;

    /// Create an index. Conflicting definitions fail with `IndexOptionsConflict`.
    fn create_index(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
        index: IndexSpec,
    ) -> BoxFuture<'_, Result<()>>;

    /// Drop an index by name. Fails with `IndexNotFound` when absent.
    fn drop_index(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
        index_name: Box<str>,
    ) -> BoxFuture<'_, Result<()>>;

    /// Insert documents in one request. Returns the inserted count.
    fn insert_many(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
        documents: Vec<Document>,
        options: InsertManyOptions,
    ) -> BoxFuture<'_, Result<usize>>;
}

/// Opens a store handle (connect-by-URL or equivalent).
pub trait DocumentStoreConnector: Send + Sync {
    /// Connect and return a ready store.
    fn connect(&self, ctx: &RequestContext) -> BoxFuture<'_, Result<Arc<dyn DocumentStorePort>>>;
}
