//! Diagnostic logger selection.

use crate::InfraResult;
use mongo_log_sink_adapters::{JsonLogger, TracingLogger};
use mongo_log_sink_ports::{DiagnosticLevel, LoggerPort};
use mongo_log_sink_shared::{ErrorCode, ErrorEnvelope};
use std::str::FromStr;
use std::sync::Arc;

/// Where the sink's own diagnostics go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagnosticsOutput {
    /// JSON lines on stderr.
    #[default]
    Json,
    /// Forward to the host's `tracing` subscriber.
    Tracing,
    /// Drop everything.
    Disabled,
}

impl FromStr for DiagnosticsOutput {
    type Err = ErrorEnvelope;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "json" | "stderr" => Ok(Self::Json),
            "tracing" => Ok(Self::Tracing),
            "off" | "none" | "disabled" => Ok(Self::Disabled),
            _ => Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                format!("unsupported diagnostics output: {input}"),
            )
            .with_metadata("output", input.to_owned())),
        }
    }
}

/// Parse a minimum diagnostic level (`debug`, `info`, `warn`, `error`).
pub fn parse_level(input: &str) -> InfraResult<DiagnosticLevel> {
    match input.trim().to_ascii_lowercase().as_str() {
        "debug" | "trace" => Ok(DiagnosticLevel::Debug),
        "info" | "information" => Ok(DiagnosticLevel::Info),
        "warn" | "warning" => Ok(DiagnosticLevel::Warn),
        "error" | "fatal" => Ok(DiagnosticLevel::Error),
        _ => Err(ErrorEnvelope::invalid_argument(
            "level",
            format!("unsupported diagnostic level: {input}"),
        )),
    }
}

/// Build the diagnostics logger for `output`.
///
/// `min_level` applies to the JSON logger; a `tracing` subscriber filters
/// on its own.
#[must_use]
pub fn build_logger(
    output: DiagnosticsOutput,
    min_level: DiagnosticLevel,
) -> Option<Arc<dyn LoggerPort>> {
    match output {
        DiagnosticsOutput::Json => Some(Arc::new(JsonLogger::stderr().with_min_level(min_level))),
        DiagnosticsOutput::Tracing => Some(Arc::new(TracingLogger::new())),
        DiagnosticsOutput::Disabled => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongo_log_sink_shared::Result;

    #[test]
    fn outputs_parse_case_insensitively() -> Result<()> {
        assert_eq!("JSON".parse::<DiagnosticsOutput>()?, DiagnosticsOutput::Json);
        assert_eq!(" tracing ".parse::<DiagnosticsOutput>()?, DiagnosticsOutput::Tracing);
        assert_eq!("off".parse::<DiagnosticsOutput>()?, DiagnosticsOutput::Disabled);
        assert!("syslog".parse::<DiagnosticsOutput>().is_err());
        Ok(())
    }

    #[test]
    fn levels_accept_sink_level_names() -> Result<()> {
        assert_eq!(parse_level("Warning")?, DiagnosticLevel::Warn);
        assert_eq!(parse_level("information")?, DiagnosticLevel::Info);
        let error = parse_level("loud").err();
        assert_eq!(
            error.and_then(|error| error.metadata_value("argument").map(str::to_owned)),
            Some("level".to_owned())
        );
        Ok(())
    }

    #[test]
    fn disabled_output_builds_no_logger() {
        assert!(build_logger(DiagnosticsOutput::Disabled, DiagnosticLevel::Info).is_none());
        assert!(build_logger(DiagnosticsOutput::Tracing, DiagnosticLevel::Info).is_some());
    }
}
