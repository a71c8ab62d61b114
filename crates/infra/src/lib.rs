//! # mongo-log-sink-infra
//!
//! Infrastructure wiring and runtime composition.
//! This crate depends on `app`, `adapters`, `config`, and `shared`.

/// Config loading helpers.
pub mod config_check;
/// Environment validation helpers.
pub mod env_check;
/// Diagnostics logger selection.
pub mod logger_factory;
/// Sink assembly from config.
pub mod sink_factory;
/// Global `tracing` subscriber setup.
pub mod telemetry;

pub use config_check::{load_effective_config_json, load_validated_config};
pub use env_check::{InfraError, InfraResult, validate_env_parsing};
pub use logger_factory::{DiagnosticsOutput, build_logger, parse_level};
pub use sink_factory::{build_sink, build_sink_options, build_store_source};
pub use telemetry::{DEFAULT_TRACING_FILTER, TracingFormat, init_tracing};

// Re-export redaction utilities for host boundary sanitization
pub use mongo_log_sink_shared::{is_secret_key, redact_if_secret};

/// Returns the infra crate version.
#[must_use]
pub const fn infra_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
