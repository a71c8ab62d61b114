//! MongoDB error mapping helpers.

use mongo_log_sink_ports::{STORE_ERROR_NAMESPACE, server_error};
use mongo_log_sink_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use mongodb::error::{ErrorKind, RETRYABLE_WRITE_ERROR, WriteFailure};

/// Context attached to mapped driver errors.
#[derive(Debug, Clone)]
pub struct MongoErrorContext {
    /// Operation label (`create_index`, `insert_many`, ...).
    pub operation: &'static str,
    /// Collection the request targeted, when collection-scoped.
    pub collection: Option<String>,
}

impl MongoErrorContext {
    /// Context for a database-level operation.
    #[must_use]
    pub const fn database(operation: &'static str) -> Self {
        Self {
            operation,
            collection: None,
        }
    }

    /// Context for a collection-scoped operation.
    pub fn collection(operation: &'static str, collection: impl Into<String>) -> Self {
        Self {
            operation,
            collection: Some(collection.into()),
        }
    }

    fn annotate(&self, envelope: ErrorEnvelope) -> ErrorEnvelope {
        let envelope = envelope
            .with_metadata("provider", super::MONGO_PROVIDER_ID)
            .with_metadata("operation", self.operation);
        match self.collection.as_ref() {
            Some(collection) => envelope.with_metadata("collection", collection.clone()),
            None => envelope,
        }
    }
}

/// Errors resolving the database a connection string targets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MongoTargetError {
    /// The connection string did not parse.
    #[error("invalid MongoDB connection string: {reason}")]
    InvalidConnectionString {
        /// Driver-reported reason.
        reason: String,
    },
    /// Neither the connection string nor the caller named a database.
    #[error("connection string does not name a database")]
    MissingDatabase,
}

impl MongoTargetError {
    const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConnectionString { .. } => "invalid_connection_string",
            Self::MissingDatabase => "missing_database",
        }
    }
}

impl From<MongoTargetError> for ErrorEnvelope {
    fn from(error: MongoTargetError) -> Self {
        Self::expected(
            ErrorCode::new(STORE_ERROR_NAMESPACE, error.code()),
            error.to_string(),
        )
        .with_metadata("provider", super::MONGO_PROVIDER_ID)
    }
}

/// Map a server-reported failure (command or write error).
///
/// The envelope's code is the server's code name; retryable-write labels
/// flip the class to `Retriable`.
pub fn map_server_failure(
    server_code: i32,
    code_name: Option<&str>,
    message: &str,
    retryable: bool,
    ctx: &MongoErrorContext,
) -> ErrorEnvelope {
    let mut envelope = server_error(server_code, code_name, message);
    if retryable {
        envelope.class = ErrorClass::Retriable;
    }
    ctx.annotate(envelope)
}

/// Map a driver error into the shared envelope format.
pub fn map_mongo_error(error: &mongodb::error::Error, ctx: &MongoErrorContext) -> ErrorEnvelope {
    let retryable = error.contains_label(RETRYABLE_WRITE_ERROR);
    match error.kind.as_ref() {
        ErrorKind::Command(command) => map_server_failure(
            command.code,
            Some(command.code_name.as_str()),
            &command.message,
            retryable,
            ctx,
        ),
        ErrorKind::Write(WriteFailure::WriteError(write)) => map_server_failure(
            write.code,
            write.code_name.as_deref(),
            &write.message,
            retryable,
            ctx,
        ),
        ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
            ctx.annotate(ErrorEnvelope::unexpected(
                ErrorCode::timeout(),
                format!("MongoDB request timed out: {error}"),
                ErrorClass::Retriable,
            ))
        },
        ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::DnsResolve { .. } => ctx.annotate(ErrorEnvelope::unexpected(
            store_code("connection"),
            format!("MongoDB connection failed: {error}"),
            ErrorClass::Retriable,
        )),
        ErrorKind::Authentication { .. } => ctx.annotate(ErrorEnvelope::expected(
            store_code("authentication"),
            format!("MongoDB authentication failed: {error}"),
        )),
        ErrorKind::InvalidArgument { .. } => ctx.annotate(ErrorEnvelope::expected(
            ErrorCode::invalid_input(),
            format!("MongoDB rejected the request: {error}"),
        )),
        _ => ctx.annotate(ErrorEnvelope::unexpected(
            store_code("unknown"),
            format!("MongoDB request failed: {error}"),
            if retryable {
                ErrorClass::Retriable
            } else {
                ErrorClass::NonRetriable
            },
        )),
    }
}

fn store_code(code: &str) -> ErrorCode {
    ErrorCode::new(STORE_ERROR_NAMESPACE, code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongo_log_sink_ports::{SERVER_CODE_METADATA, StoreErrorCode};

    #[test]
    fn server_failures_keep_code_name_and_number() {
        let ctx = MongoErrorContext::collection("create_index", "log");
        let error = map_server_failure(
            85,
            Some("IndexOptionsConflict"),
            "Index with name: serilog_sink_expired_ttl already exists with different options",
            false,
            &ctx,
        );

        assert!(StoreErrorCode::IndexOptionsConflict.matches(&error));
        assert_eq!(error.metadata_value(SERVER_CODE_METADATA), Some("85"));
        assert_eq!(error.metadata_value("collection"), Some("log"));
        assert_eq!(error.metadata_value("provider"), Some("mongodb"));
        assert_eq!(error.class, ErrorClass::NonRetriable);
    }

    #[test]
    fn retryable_labels_change_class() {
        let ctx = MongoErrorContext::database("insert_many");
        let error = map_server_failure(91, Some("ShutdownInProgress"), "stepping down", true, &ctx);
        assert_eq!(error.class, ErrorClass::Retriable);
        assert_eq!(error.code.code(), "ShutdownInProgress");
        assert_eq!(error.metadata_value("collection"), None);
    }

    #[test]
    fn write_errors_without_name_fall_back_to_known_codes() {
        let ctx = MongoErrorContext::database("create_collection");
        let error = map_server_failure(48, None, "collection already exists", false, &ctx);
        assert!(StoreErrorCode::NamespaceExists.matches(&error));
    }

    #[test]
    fn target_errors_map_into_store_namespace() {
        let error = ErrorEnvelope::from(MongoTargetError::MissingDatabase);
        assert_eq!(error.code, ErrorCode::new("store", "missing_database"));
    }
}
