//! Log event → stored record mapping.

use crate::document_sanitizer::sanitize_document;
use crate::exception_serializer::ExceptionSerializer;
use crate::value_sanitizer::ValueSanitizer;
use mongo_log_sink_domain::{LogEvent, LogRecord};
use mongo_log_sink_shared::{ErrorEnvelope, Result};

/// Maps log events into [`LogRecord`]s.
#[derive(Debug, Clone, Default)]
pub struct EntryMapper {
    values: ValueSanitizer,
    exceptions: ExceptionSerializer,
}

impl EntryMapper {
    /// Create a mapper from its collaborators.
    #[must_use]
    pub const fn new(values: ValueSanitizer, exceptions: ExceptionSerializer) -> Self {
        Self { values, exceptions }
    }

    /// Map one event.
    ///
    /// The template text is kept only when `include_message_template` is set.
    /// Fails only when `event` is absent.
    pub fn map_from(
        &self,
        event: Option<&LogEvent>,
        include_message_template: bool,
    ) -> Result<LogRecord> {
        let event = event.ok_or_else(|| {
            ErrorEnvelope::invalid_argument("log_event", "a log event is required")
        })?;

        Ok(LogRecord {
            utc_timestamp: event.utc_timestamp(),
            level: event.level,
            rendered_message: event.render_message(),
            message_template: include_message_template
                .then(|| event.message_template.text().to_owned()),
            properties: self.values.properties_document(&event.properties),
            exception: event
                .exception
                .as_ref()
                .map(|exception| sanitize_document(self.exceptions.serialize(exception))),
            trace_id: event.trace_id.clone(),
            span_id: event.span_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use mongo_log_sink_domain::{
        DocumentValue, ExceptionInfo, LogLevel, LogValue, fields,
    };
    use mongo_log_sink_shared::ErrorCode;

    fn utc() -> Result<DateTime<Utc>> {
        Utc.with_ymd_and_hms(2022, 10, 15, 8, 30, 0)
            .single()
            .ok_or_else(|| ErrorEnvelope::expected(ErrorCode::internal(), "fixture time"))
    }

    #[test]
    fn missing_event_is_an_argument_error() {
        let error = EntryMapper::default().map_from(None, true).err();
        assert_eq!(error.map(|error| error.code), Some(ErrorCode::invalid_input()));
    }

    #[test]
    fn maps_level_time_message_and_properties() -> Result<()> {
        let offset = chrono::FixedOffset::east_opt(2 * 3600)
            .ok_or_else(|| ErrorEnvelope::expected(ErrorCode::internal(), "offset"))?;
        let event = LogEvent::new(
            utc()?.with_timezone(&offset),
            LogLevel::Warning,
            "User {UserId} from {Host:l} took {Elapsed} ms",
        )
        .with_property("UserId", "ada")
        .with_property("Host", "db.internal")
        .with_property("Elapsed", 12)
        .with_property("Request.Path", "/health");

        let record = EntryMapper::default().map_from(Some(&event), false)?;
        assert_eq!(record.utc_timestamp, utc()?);
        assert_eq!(record.level, LogLevel::Warning);
        assert_eq!(record.rendered_message, "User \"ada\" from db.internal took 12 ms");
        assert_eq!(record.message_template, None);
        assert_eq!(
            record.properties.keys().collect::<Vec<_>>(),
            ["UserId", "Host", "Elapsed", "Request-Path"]
        );
        assert_eq!(record.exception, None);
        assert_eq!(record.trace_id, None);
        Ok(())
    }

    #[test]
    fn template_and_trace_ids_are_optional_fields() -> Result<()> {
        let event = LogEvent::at_utc(utc()?, LogLevel::Information, "tick")
            .with_trace("4bf92f3577b34da6a3ce929d0e0e4736", "00f067aa0ba902b7");

        let record = EntryMapper::default().map_from(Some(&event), true)?;
        assert_eq!(record.message_template.as_deref(), Some("tick"));

        let document = record.into_document();
        assert_eq!(
            document.get(fields::TRACE_ID),
            Some(&DocumentValue::from("4bf92f3577b34da6a3ce929d0e0e4736"))
        );
        assert_eq!(
            document.get(fields::SPAN_ID),
            Some(&DocumentValue::from("00f067aa0ba902b7"))
        );
        assert!(!document.contains_key(fields::EXCEPTION));
        Ok(())
    }

    #[test]
    fn exception_field_names_are_sanitized() -> Result<()> {
        let exception = ExceptionInfo::new("ValidationError", "rejected")
            .with_data("Inner.Value", LogValue::from(1))
            .with_data("$ref", LogValue::from("x"));
        let event = LogEvent::at_utc(utc()?, LogLevel::Error, "failed").with_exception(exception);

        let record = EntryMapper::default().map_from(Some(&event), false)?;
        let data = record
            .exception
            .as_ref()
            .and_then(|exception| exception.get("Data"))
            .and_then(DocumentValue::as_document);
        assert_eq!(
            data.map(|data| data.keys().collect::<Vec<_>>()),
            Some(vec!["Inner-Value", "_ref"])
        );
        Ok(())
    }
}
