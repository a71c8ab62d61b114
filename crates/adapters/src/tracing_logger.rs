//! Diagnostic logger that forwards to `tracing`.

use mongo_log_sink_ports::{DiagnosticEvent, DiagnosticFields, DiagnosticLevel, LoggerPort};
use mongo_log_sink_shared::{REDACTED, is_secret_key};
use serde_json::{Map, Value};

/// Target used for every forwarded event.
pub const TRACING_TARGET: &str = "mongo_log_sink";

/// Forwards diagnostic events to the host's `tracing` subscriber.
///
/// Structured fields and the error payload are attached as JSON text under
/// `fields` and `error`; the event name goes to `event`.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    base_fields: DiagnosticFields,
}

impl TracingLogger {
    /// Create a tracing logger without base fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoggerPort for TracingLogger {
    fn log(&self, event: DiagnosticEvent) {
        let mut fields = self.base_fields.clone();
        fields.extend(event.fields.unwrap_or_default());
        let fields = render_fields(fields);
        let error = event
            .error
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default();
        let name = event.event.as_ref();
        let message = event.message.as_ref();

        match event.level {
            DiagnosticLevel::Debug => {
                tracing::debug!(target: TRACING_TARGET, event = name, fields = %fields, error = %error, "{message}");
            },
            DiagnosticLevel::Info => {
                tracing::info!(target: TRACING_TARGET, event = name, fields = %fields, error = %error, "{message}");
            },
            DiagnosticLevel::Warn => {
                tracing::warn!(target: TRACING_TARGET, event = name, fields = %fields, error = %error, "{message}");
            },
            DiagnosticLevel::Error => {
                tracing::error!(target: TRACING_TARGET, event = name, fields = %fields, error = %error, "{message}");
            },
        }
    }

    fn child(&self, fields: DiagnosticFields) -> Box<dyn LoggerPort> {
        let mut merged = self.base_fields.clone();
        merged.extend(fields);
        Box::new(Self {
            base_fields: merged,
        })
    }
}

fn render_fields(fields: DiagnosticFields) -> String {
    if fields.is_empty() {
        return String::new();
    }
    let object = fields
        .into_iter()
        .map(|(key, value)| {
            let value = if is_secret_key(&key) {
                Value::String(REDACTED.to_owned())
            } else {
                value
            };
            (key.into_string(), value)
        })
        .collect::<Map<_, _>>();
    Value::Object(object).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongo_log_sink_ports::diagnostic_fields;
    use serde_json::json;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .map_err(|_| io::Error::other("poisoned"))?
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    impl Captured {
        fn text(&self) -> String {
            self.0
                .lock()
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .unwrap_or_default()
        }
    }

    #[test]
    fn events_reach_the_subscriber_with_redacted_fields() {
        let output = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(output.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let logger = TracingLogger::new()
                .child(diagnostic_fields([("connectionString", json!("mongodb://x"))]));
            logger.warn(
                "sink.ttl.recreate_failed",
                "could not recreate TTL index",
                Some(diagnostic_fields([("collection", json!("log"))])),
            );
        });

        let text = output.text();
        assert!(text.contains("WARN"));
        assert!(text.contains("sink.ttl.recreate_failed"));
        assert!(text.contains("could not recreate TTL index"));
        assert!(text.contains(REDACTED));
        assert!(!text.contains("mongodb://x"));
    }

    #[test]
    fn empty_fields_render_as_empty_text() {
        assert_eq!(render_fields(DiagnosticFields::new()), "");
    }
}
