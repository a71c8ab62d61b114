//! Test fixtures for shared and store error envelopes.

use mongo_log_sink_ports::{StoreErrorCode, server_error};
use mongo_log_sink_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Return a list of common error codes used in tests.
pub fn common_error_codes() -> Vec<ErrorCode> {
    vec![
        ErrorCode::cancelled(),
        ErrorCode::invalid_input(),
        ErrorCode::timeout(),
        ErrorCode::io(),
        ErrorCode::internal(),
    ]
}

/// A cancellation error fixture.
pub fn cancelled_error() -> ErrorEnvelope {
    ErrorEnvelope::cancelled("cancelled")
}

/// An invalid input error fixture.
pub fn invalid_input_error() -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::invalid_input(), "invalid input")
}

/// A retriable timeout error fixture.
pub fn timeout_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(ErrorCode::timeout(), "timeout", ErrorClass::Retriable)
}

/// A server error fixture for a known store code.
pub fn store_error(code: StoreErrorCode) -> ErrorEnvelope {
    code.to_error(format!("{} (fixture)", code.name()))
}

/// A server error fixture the sink does not special-case.
pub fn unauthorized_error() -> ErrorEnvelope {
    server_error(13, Some("Unauthorized"), "not authorized on logs")
}
