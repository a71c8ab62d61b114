//! Log events as handed over by the logging pipeline.

use crate::template::MessageTemplate;
use crate::value::LogValue;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Event severity, stored by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    /// Most detailed tracing output.
    Verbose,
    /// Internal diagnostics.
    Debug,
    /// Normal operation.
    Information,
    /// Degraded but functional.
    Warning,
    /// Failed operation.
    Error,
    /// Unrecoverable failure.
    Fatal,
}

impl LogLevel {
    /// Textual name written to storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Verbose => "Verbose",
            Self::Debug => "Debug",
            Self::Information => "Information",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Fatal => "Fatal",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        [
            Self::Verbose,
            Self::Debug,
            Self::Information,
            Self::Warning,
            Self::Error,
            Self::Fatal,
        ]
        .into_iter()
        .find(|level| level.as_str().eq_ignore_ascii_case(input.trim()))
        .ok_or_else(|| format!("unknown log level `{input}`"))
    }
}

/// Captured error information attached to an event.
///
/// The sink owns the mapping of these members to stored field names, so
/// nothing here depends on a particular error type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExceptionInfo {
    /// Concrete error type name.
    pub type_name: String,
    /// Error message.
    pub message: String,
    /// Component that raised the error.
    pub source: Option<String>,
    /// Captured stack trace / backtrace text.
    pub stack_trace: Option<String>,
    /// Documentation link.
    pub help_link: Option<String>,
    /// Numeric result code.
    pub h_result: Option<i32>,
    /// Arbitrary extra data; keys are not controlled by the sink.
    pub data: Vec<(String, LogValue)>,
    /// Direct cause.
    pub inner: Option<Box<ExceptionInfo>>,
    /// Sibling causes (aggregate errors).
    pub inner_exceptions: Vec<ExceptionInfo>,
}

impl ExceptionInfo {
    /// Create an exception with a type name and message.
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    /// Capture a Rust error and its `source()` chain.
    pub fn from_error<E: std::error::Error + 'static>(error: &E) -> Self {
        let full = std::any::type_name::<E>();
        let short = full.rsplit("::").next().unwrap_or(full);
        Self::capture(short.to_owned(), error)
    }

    fn capture(type_name: String, error: &(dyn std::error::Error + 'static)) -> Self {
        let mut info = Self::new(type_name, error.to_string());
        if let Some(cause) = error.source() {
            info.inner = Some(Box::new(Self::capture(debug_type_name(cause), cause)));
        }
        info
    }

    /// Attach a data entry.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<LogValue>) -> Self {
        self.data.push((key.into(), value.into()));
        self
    }

    /// Attach a direct cause.
    #[must_use]
    pub fn with_inner(mut self, inner: Self) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    /// Attach a stack trace.
    #[must_use]
    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }
}

// Causes are only reachable as trait objects; the Debug output's leading
// identifier is the closest thing to a type name.
fn debug_type_name(error: &(dyn std::error::Error + 'static)) -> String {
    let debug = format!("{error:?}");
    debug
        .split(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
        .find(|part| !part.is_empty())
        .unwrap_or("Error")
        .to_owned()
}

/// One structured log event.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    /// When the event happened, with the producer's offset.
    pub timestamp: DateTime<FixedOffset>,
    /// Severity.
    pub level: LogLevel,
    /// Parsed template.
    pub message_template: MessageTemplate,
    /// Ordered property bag.
    pub properties: Vec<(String, LogValue)>,
    /// Attached error, if any.
    pub exception: Option<ExceptionInfo>,
    /// Active trace id at emit time.
    pub trace_id: Option<String>,
    /// Active span id at emit time.
    pub span_id: Option<String>,
}

impl LogEvent {
    /// Create an event without properties.
    pub fn new(
        timestamp: DateTime<FixedOffset>,
        level: LogLevel,
        message_template: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            level,
            message_template: MessageTemplate::parse(message_template),
            properties: Vec::new(),
            exception: None,
            trace_id: None,
            span_id: None,
        }
    }

    /// Create an event stamped in UTC.
    pub fn at_utc(
        timestamp: DateTime<Utc>,
        level: LogLevel,
        message_template: impl Into<String>,
    ) -> Self {
        Self::new(timestamp.fixed_offset(), level, message_template)
    }

    /// Append a property. Later properties with the same name shadow earlier ones.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<LogValue>) -> Self {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.properties.iter_mut().find(|(key, _)| *key == name) {
            slot.1 = value;
        } else {
            self.properties.push((name, value));
        }
        self
    }

    /// Attach an exception.
    #[must_use]
    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    /// Attach trace correlation ids.
    #[must_use]
    pub fn with_trace(mut self, trace_id: impl Into<String>, span_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self.span_id = Some(span_id.into());
        self
    }

    /// Render the message template against the event's properties.
    #[must_use]
    pub fn render_message(&self) -> String {
        self.message_template.render(&self.properties)
    }

    /// Timestamp converted to UTC.
    #[must_use]
    pub fn utc_timestamp(&self) -> DateTime<Utc> {
        self.timestamp.with_timezone(&Utc)
    }
}
