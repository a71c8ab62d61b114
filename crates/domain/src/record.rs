//! The stored shape of one log event.

use crate::document::{Document, DocumentValue};
use crate::event::LogLevel;
use chrono::{DateTime, Utc};

/// Top-level field names of a stored log document.
pub mod fields {
    /// UTC timestamp; also the TTL index key.
    pub const UTC_TIMESTAMP: &str = "UtcTimeStamp";
    /// Level name.
    pub const LEVEL: &str = "Level";
    /// Raw template text.
    pub const MESSAGE_TEMPLATE: &str = "MessageTemplate";
    /// Rendered message.
    pub const RENDERED_MESSAGE: &str = "RenderedMessage";
    /// Sanitized property bag.
    pub const PROPERTIES: &str = "Properties";
    /// Sanitized exception document.
    pub const EXCEPTION: &str = "Exception";
    /// Trace correlation id.
    pub const TRACE_ID: &str = "TraceId";
    /// Span correlation id.
    pub const SPAN_ID: &str = "SpanId";
}

/// One mapped log event, ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Event time in UTC.
    pub utc_timestamp: DateTime<Utc>,
    /// Severity.
    pub level: LogLevel,
    /// Rendered message.
    pub rendered_message: String,
    /// Raw template, only when requested.
    pub message_template: Option<String>,
    /// Sanitized properties.
    pub properties: Document,
    /// Sanitized exception document.
    pub exception: Option<Document>,
    /// Trace id.
    pub trace_id: Option<String>,
    /// Span id.
    pub span_id: Option<String>,
}

impl LogRecord {
    /// Flatten into a document. Absent optionals are omitted.
    #[must_use]
    pub fn into_document(self) -> Document {
        let mut document = Document::with_capacity(8);
        document.insert(fields::UTC_TIMESTAMP, DocumentValue::DateTime(self.utc_timestamp));
        document.insert(fields::LEVEL, self.level.as_str());
        if let Some(template) = self.message_template {
            document.insert(fields::MESSAGE_TEMPLATE, template);
        }
        document.insert(fields::RENDERED_MESSAGE, self.rendered_message);
        document.insert(fields::PROPERTIES, self.properties);
        if let Some(exception) = self.exception {
            document.insert(fields::EXCEPTION, exception);
        }
        if let Some(trace_id) = self.trace_id {
            document.insert(fields::TRACE_ID, trace_id);
        }
        if let Some(span_id) = self.span_id {
            document.insert(fields::SPAN_ID, span_id);
        }
        document
    }
}
