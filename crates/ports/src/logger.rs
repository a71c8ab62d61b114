//! Self-diagnostic logging boundary contract.
//!
//! This is the sink's side channel for its own failures (for example a TTL
//! index that could not be recreated). It never carries application log
//! events; those go through the document store.

use mongo_log_sink_shared::ErrorEnvelope;
use std::collections::BTreeMap;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticLevel {
    /// Debug.
    Debug,
    /// Info.
    Info,
    /// Warn.
    Warn,
    /// Error.
    Error,
}

impl DiagnosticLevel {
    /// Lower-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Additional event fields.
pub type DiagnosticFields = BTreeMap<Box<str>, serde_json::Value>;

/// Structured diagnostic event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEvent {
    /// Stable event name (e.g. `sink.ttl.recreate_failed`).
    pub event: Box<str>,
    /// Severity.
    pub level: DiagnosticLevel,
    /// Human-readable message (safe, redacted).
    pub message: Box<str>,
    /// Optional structured fields.
    pub fields: Option<DiagnosticFields>,
    /// Optional error payload.
    pub error: Option<serde_json::Value>,
}

impl DiagnosticEvent {
    /// Create an event without fields or error.
    pub fn new(event: &str, level: DiagnosticLevel, message: &str) -> Self {
        Self {
            event: event.into(),
            level,
            message: message.into(),
            fields: None,
            error: None,
        }
    }

    /// Attach fields.
    #[must_use]
    pub fn with_fields(mut self, fields: Option<DiagnosticFields>) -> Self {
        self.fields = fields;
        self
    }

    /// Attach an error envelope as the error payload.
    #[must_use]
    pub fn with_error(mut self, error: &ErrorEnvelope) -> Self {
        self.error = serde_json::to_value(error).ok();
        self
    }
}

/// Boundary contract for self-diagnostic logging.
pub trait LoggerPort: Send + Sync {
    /// Emit a structured event.
    fn log(&self, event: DiagnosticEvent);

    /// Create a child logger with base fields applied to every event.
    fn child(&self, fields: DiagnosticFields) -> Box<dyn LoggerPort>;

    /// Convenience: debug event.
    fn debug(&self, event: &str, message: &str, fields: Option<DiagnosticFields>) {
        self.log(DiagnosticEvent::new(event, DiagnosticLevel::Debug, message).with_fields(fields));
    }

    /// Convenience: info event.
    fn info(&self, event: &str, message: &str, fields: Option<DiagnosticFields>) {
        self.log(DiagnosticEvent::new(event, DiagnosticLevel::Info, message).with_fields(fields));
    }

    /// Convenience: warn event.
    fn warn(&self, event: &str, message: &str, fields: Option<DiagnosticFields>) {
        self.log(DiagnosticEvent::new(event, DiagnosticLevel::Warn, message).with_fields(fields));
    }

    /// Convenience: error event.
    fn error(&self, event: &str, message: &str, fields: Option<DiagnosticFields>) {
        self.log(DiagnosticEvent::new(event, DiagnosticLevel::Error, message).with_fields(fields));
    }

    /// Convenience: event at `level` carrying an error envelope.
    fn failure(
        &self,
        level: DiagnosticLevel,
        event: &str,
        message: &str,
        error: &ErrorEnvelope,
        fields: Option<DiagnosticFields>,
    ) {
        self.log(
            DiagnosticEvent::new(event, level, message)
                .with_fields(fields)
                .with_error(error),
        );
    }
}

/// Build diagnostic fields from `(key, value)` pairs.
pub fn diagnostic_fields<const N: usize>(
    pairs: [(&str, serde_json::Value); N],
) -> DiagnosticFields {
    pairs
        .into_iter()
        .map(|(key, value)| (Box::from(key), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongo_log_sink_shared::ErrorCode;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture(Mutex<Vec<DiagnosticEvent>>);

    impl LoggerPort for Capture {
        fn log(&self, event: DiagnosticEvent) {
            if let Ok(mut events) = self.0.lock() {
                events.push(event);
            }
        }

        fn child(&self, _fields: DiagnosticFields) -> Box<dyn LoggerPort> {
            Box::new(Self::default())
        }
    }

    #[test]
    fn failure_attaches_error_payload() {
        let capture = Capture::default();
        let error = ErrorEnvelope::expected(ErrorCode::new("store", "IndexNotFound"), "missing");

        capture.failure(
            DiagnosticLevel::Warn,
            "sink.ttl.recreate_failed",
            "ttl index not recreated",
            &error,
            Some(diagnostic_fields([("collection", "log".into())])),
        );

        let events = capture.0.lock().map(|events| events.clone()).unwrap_or_default();
        assert_eq!(events.len(), 1);
        let event = events.first();
        assert_eq!(event.map(|event| event.level), Some(DiagnosticLevel::Warn));
        assert!(event.and_then(|event| event.error.as_ref()).is_some());
        assert_eq!(
            event
                .and_then(|event| event.fields.as_ref())
                .and_then(|fields| fields.get("collection"))
                .and_then(serde_json::Value::as_str),
            Some("log")
        );
    }
}
