//! Process-wide `tracing` subscriber setup for hosts without one.

use crate::InfraResult;
use mongo_log_sink_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_TRACING_FILTER: &str = "info";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Install a global subscriber writing to stderr, filtered by `RUST_LOG`.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(format: TracingFormat) -> InfraResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_TRACING_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        TracingFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        TracingFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    installed.map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("infra", "tracing_init"),
            format!("failed to install tracing subscriber: {error}"),
            ErrorClass::NonRetriable,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_reported() {
        assert!(init_tracing(TracingFormat::Json).is_ok());
        let error = init_tracing(TracingFormat::Text).err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("infra", "tracing_init"))
        );
    }
}
