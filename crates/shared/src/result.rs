//! Result helpers for shared error handling.

use crate::errors::ErrorEnvelope;

/// Shared result type used across the workspace.
pub type Result<T, E = ErrorEnvelope> = std::result::Result<T, E>;

/// Extension helpers for attaching diagnostics to failed results.
pub trait ResultExt<T> {
    /// Attach a metadata entry to the error, if any.
    fn with_error_metadata(self, key: &'static str, value: impl Into<String>) -> Result<T>;

    /// Record the operation name on the error, if any.
    fn with_operation(self, operation: &'static str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_error_metadata(self, key: &'static str, value: impl Into<String>) -> Result<T> {
        self.map_err(|error| error.with_metadata(key, value))
    }

    fn with_operation(self, operation: &'static str) -> Result<T> {
        self.with_error_metadata("operation", operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    #[test]
    fn operation_is_attached_on_error() {
        let value: Result<i32> = Err(ErrorEnvelope::expected(ErrorCode::io(), "boom"));
        let error = value.with_operation("store.insert_many").err();

        assert_eq!(
            error.as_ref().and_then(|error| error.metadata_value("operation")),
            Some("store.insert_many")
        );
    }

    #[test]
    fn ok_values_pass_through() {
        let value: Result<i32> = Ok(3);
        assert!(matches!(value.with_error_metadata("collection", "log"), Ok(3)));
    }
}
