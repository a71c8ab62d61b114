//! JSON-lines diagnostic logger.

use crate::line_sink::{LineSink, StderrLineSink};
use chrono::SecondsFormat;
use mongo_log_sink_ports::{
    ClockPort, DiagnosticEvent, DiagnosticFields, DiagnosticLevel, LoggerPort, SystemClock,
};
use mongo_log_sink_shared::{REDACTED, is_secret_key};
use serde_json::{Map, Value};
use std::sync::Arc;

const SERIALIZE_FAILED_LINE: &str = "{\"level\":\"error\",\"event\":\"logger.serialize_failed\",\"message\":\"diagnostic serialization failed\"}\n";

/// Logger emitting one JSON object per diagnostic event.
///
/// Line shape: `{"timestamp","level","event","message","fields"?,"error"?}`.
/// Values under secret-looking keys (passwords, connection strings, tokens)
/// are replaced with `[REDACTED]` at any depth.
#[derive(Clone)]
pub struct JsonLogger {
    sink: Arc<dyn LineSink>,
    clock: Arc<dyn ClockPort>,
    base_fields: DiagnosticFields,
    min_level: DiagnosticLevel,
}

impl JsonLogger {
    /// Create a JSON logger backed by the provided sink.
    #[must_use]
    pub fn new(sink: Arc<dyn LineSink>) -> Self {
        Self {
            sink,
            clock: Arc::new(SystemClock),
            base_fields: DiagnosticFields::new(),
            min_level: DiagnosticLevel::Info,
        }
    }

    /// JSON logger writing to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Arc::new(StderrLineSink))
    }

    /// Use a custom clock for timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn ClockPort>) -> Self {
        self.clock = clock;
        self
    }

    /// Set base fields applied to every event.
    #[must_use]
    pub fn with_base_fields(mut self, fields: DiagnosticFields) -> Self {
        self.base_fields = fields;
        self
    }

    /// Set the minimum level.
    #[must_use]
    pub const fn with_min_level(mut self, level: DiagnosticLevel) -> Self {
        self.min_level = level;
        self
    }

    fn encode(&self, event: DiagnosticEvent) -> String {
        let mut fields = self.base_fields.clone();
        fields.extend(event.fields.unwrap_or_default());

        let mut payload = Map::new();
        payload.insert(
            "timestamp".to_owned(),
            Value::String(
                self.clock
                    .now_utc()
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
        );
        payload.insert("level".to_owned(), Value::from(event.level.as_str()));
        payload.insert("event".to_owned(), Value::from(event.event.as_ref()));
        payload.insert("message".to_owned(), Value::from(event.message.as_ref()));
        if !fields.is_empty() {
            let mut object = fields
                .into_iter()
                .map(|(key, value)| (key.into_string(), value))
                .collect::<Map<_, _>>();
            redact_object(&mut object);
            payload.insert("fields".to_owned(), Value::Object(object));
        }
        if let Some(mut error) = event.error {
            redact_value(&mut error);
            payload.insert("error".to_owned(), error);
        }

        serde_json::to_string(&Value::Object(payload)).map_or_else(
            |_| SERIALIZE_FAILED_LINE.to_owned(),
            |mut encoded| {
                encoded.push('\n');
                encoded
            },
        )
    }
}

impl LoggerPort for JsonLogger {
    fn log(&self, event: DiagnosticEvent) {
        if event.level < self.min_level {
            return;
        }
        let line = self.encode(event);
        self.sink.write_line(&line);
    }

    fn child(&self, fields: DiagnosticFields) -> Box<dyn LoggerPort> {
        let mut merged = self.base_fields.clone();
        merged.extend(fields);
        Box::new(Self {
            base_fields: merged,
            ..self.clone()
        })
    }
}

fn redact_object(map: &mut Map<String, Value>) {
    for (key, nested) in map.iter_mut() {
        if is_secret_key(key) {
            *nested = Value::String(REDACTED.to_owned());
        } else {
            redact_value(nested);
        }
    }
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => redact_object(map),
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {},
    }
}
