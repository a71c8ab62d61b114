//! Legacy document shape: the JSON-formatter layout older sink versions wrote.
//!
//! Fields, in order: `Timestamp` (date), `Level`, `MessageTemplate`,
//! `RenderedMessage`, `Exception` (text), `Properties`, `Renderings`,
//! `UtcTimestamp` (`yyyy-MM-dd HH:mm:ssZ` text). String values have `$`
//! replaced by `_` and `.` by `-`; timestamps inside properties are kept as
//! round-trip text. Field names are sanitized last.

use crate::document_sanitizer::sanitize_document;
use crate::value_sanitizer::{narrow_i64, u64_as_double};
use chrono::{DateTime, TimeZone};
use mongo_log_sink_domain::{
    Document, DocumentValue, ExceptionInfo, LogEvent, LogValue, NULL_FIELD_NAME, ScalarValue,
    TemplateToken,
};
use std::fmt::Write as _;

/// Stored field names of the legacy shape.
pub mod legacy_fields {
    /// Event time as a date.
    pub const TIMESTAMP: &str = "Timestamp";
    /// Level name.
    pub const LEVEL: &str = "Level";
    /// Raw template.
    pub const MESSAGE_TEMPLATE: &str = "MessageTemplate";
    /// Rendered message.
    pub const RENDERED_MESSAGE: &str = "RenderedMessage";
    /// Exception text.
    pub const EXCEPTION: &str = "Exception";
    /// Property bag.
    pub const PROPERTIES: &str = "Properties";
    /// Per-property renderings of formatted holes.
    pub const RENDERINGS: &str = "Renderings";
    /// Event time in UTC as text.
    pub const UTC_TIMESTAMP: &str = "UtcTimestamp";
    /// Structure type tag.
    pub const TYPE_TAG: &str = "_typeTag";
    /// Format of one rendering.
    pub const FORMAT: &str = "Format";
    /// Rendered text of one rendering.
    pub const RENDERING: &str = "Rendering";
}

/// Formats events in the legacy shape. Stateless.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LegacyFormatter;

impl LegacyFormatter {
    /// Build the stored document for `event`.
    #[must_use]
    pub fn format(&self, event: &LogEvent) -> Document {
        let mut document = Document::with_capacity(8);
        document.insert(legacy_fields::TIMESTAMP, DocumentValue::DateTime(event.utc_timestamp()));
        document.insert(legacy_fields::LEVEL, legacy_string(event.level.as_str()));
        document.insert(
            legacy_fields::MESSAGE_TEMPLATE,
            legacy_string(event.message_template.text()),
        );
        document.insert(legacy_fields::RENDERED_MESSAGE, legacy_string(&event.render_message()));
        if let Some(exception) = &event.exception {
            document.insert(legacy_fields::EXCEPTION, legacy_string(&exception_text(exception)));
        }
        if !event.properties.is_empty() {
            document.insert(legacy_fields::PROPERTIES, named_values(&event.properties));
        }
        if let Some(renderings) = renderings(event) {
            document.insert(legacy_fields::RENDERINGS, renderings);
        }
        document.insert(
            legacy_fields::UTC_TIMESTAMP,
            event.utc_timestamp().format("%Y-%m-%d %H:%M:%SZ").to_string(),
        );
        sanitize_document(document)
    }
}

/// Every formatted hole, grouped by property name in first-seen order.
fn renderings(event: &LogEvent) -> Option<Document> {
    let mut groups: Vec<(&str, Vec<DocumentValue>)> = Vec::new();
    for token in event.message_template.tokens() {
        let TemplateToken::Property(hole) = token else {
            continue;
        };
        let Some(format) = hole.format.as_deref() else {
            continue;
        };
        let mut entry = Document::with_capacity(2);
        entry.insert(legacy_fields::FORMAT, legacy_string(format));
        entry.insert(
            legacy_fields::RENDERING,
            legacy_string(&hole.render(&event.properties, true)),
        );
        match groups.iter_mut().find(|(name, _)| *name == hole.name) {
            Some((_, entries)) => entries.push(entry.into()),
            None => groups.push((hole.name.as_str(), vec![entry.into()])),
        }
    }
    (!groups.is_empty()).then(|| {
        groups
            .into_iter()
            .map(|(name, entries)| (name.to_owned(), DocumentValue::Array(entries)))
            .collect()
    })
}

fn named_values(values: &[(String, LogValue)]) -> Document {
    let mut document = Document::with_capacity(values.len());
    for (name, value) in values {
        document.insert(name.as_str(), convert(value));
    }
    document
}

fn convert(value: &LogValue) -> DocumentValue {
    match value {
        LogValue::Scalar(scalar) => scalar_value(scalar),
        LogValue::Structure {
            type_tag,
            properties,
        } => {
            let mut document = Document::with_capacity(properties.len() + 1);
            if let Some(tag) = type_tag {
                document.insert(legacy_fields::TYPE_TAG, legacy_string(tag));
            }
            for (name, value) in properties {
                document.insert(name.as_str(), convert(value));
            }
            DocumentValue::Document(document)
        },
        LogValue::Dictionary(entries) => {
            let mut document = Document::with_capacity(entries.len());
            for (key, value) in entries {
                let name = key
                    .to_string_or_null()
                    .map_or_else(|| NULL_FIELD_NAME.to_owned(), |key| mangle(&key));
                document.insert(name, convert(value));
            }
            DocumentValue::Document(document)
        },
        LogValue::Sequence(elements) => DocumentValue::Array(elements.iter().map(convert).collect()),
    }
}

fn scalar_value(scalar: &ScalarValue) -> DocumentValue {
    match scalar {
        ScalarValue::Null => DocumentValue::Null,
        ScalarValue::Bool(value) => DocumentValue::Bool(*value),
        ScalarValue::I32(value) => DocumentValue::Int32(*value),
        ScalarValue::I64(value) => narrow_i64(*value),
        ScalarValue::U64(value) => {
            i64::try_from(*value).map_or_else(|_| u64_as_double(*value), narrow_i64)
        },
        ScalarValue::F64(value) => DocumentValue::Double(*value),
        ScalarValue::Timestamp(value) => DocumentValue::String(round_trip(value, "Z")),
        ScalarValue::OffsetTimestamp(value) => {
            let offset = value.format("%:z").to_string();
            DocumentValue::String(round_trip(value, &offset))
        },
        ScalarValue::Char(_)
        | ScalarValue::String(_)
        | ScalarValue::Duration(_)
        | ScalarValue::Uri(_)
        | ScalarValue::Guid(_) => legacy_string(&scalar.to_string()),
    }
}

/// `yyyy-MM-ddTHH:mm:ss.fffffff` followed by `suffix`.
fn round_trip<Tz: TimeZone>(value: &DateTime<Tz>, suffix: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let ticks = value.timestamp_subsec_nanos() / 100;
    format!("{}.{ticks:07}{suffix}", value.format("%Y-%m-%dT%H:%M:%S"))
}

/// Exception text: type and message, each cause after ` ---> `, then the
/// stack trace.
fn exception_text(exception: &ExceptionInfo) -> String {
    let mut text = exception.type_name.clone();
    if !exception.message.is_empty() {
        text.push_str(": ");
        text.push_str(&exception.message);
    }
    if let Some(inner) = &exception.inner {
        text.push_str(" ---> ");
        text.push_str(&exception_text(inner));
        text.push_str("\n   --- End of inner exception stack trace ---");
    }
    for (index, inner) in exception.inner_exceptions.iter().enumerate() {
        let _ = write!(text, "\n ---> (Inner Exception #{index}) ");
        text.push_str(&exception_text(inner));
        text.push_str("<---\n");
    }
    if let Some(stack_trace) = &exception.stack_trace {
        text.push('\n');
        text.push_str(stack_trace);
    }
    text
}

fn legacy_string(value: &str) -> DocumentValue {
    DocumentValue::String(mangle(value))
}

fn mangle(value: &str) -> String {
    value.replace('$', "_").replace('.', "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeDelta, Utc};
    use mongo_log_sink_domain::LogLevel;

    fn at_utc() -> Result<DateTime<Utc>, String> {
        Utc.with_ymd_and_hms(2022, 10, 15, 8, 30, 5)
            .single()
            .map(|time| time + TimeDelta::milliseconds(250))
            .ok_or_else(|| "fixture time".to_owned())
    }

    #[test]
    fn top_level_layout_follows_the_json_formatter() -> Result<(), String> {
        let event = LogEvent::at_utc(at_utc()?, LogLevel::Warning, "Disk {Drive} at {Pct}%")
            .with_property("Drive", "C")
            .with_property("Pct", 93);

        let document = LegacyFormatter.format(&event);

        assert_eq!(
            document.keys().collect::<Vec<_>>(),
            [
                "Timestamp",
                "Level",
                "MessageTemplate",
                "RenderedMessage",
                "Properties",
                "UtcTimestamp"
            ]
        );
        assert_eq!(document.get("Timestamp"), Some(&DocumentValue::DateTime(at_utc()?)));
        assert_eq!(document.get("Level"), Some(&DocumentValue::from("Warning")));
        assert_eq!(
            document.get("RenderedMessage"),
            Some(&DocumentValue::from("Disk \"C\" at 93%"))
        );
        assert_eq!(
            document.get("UtcTimestamp"),
            Some(&DocumentValue::from("2022-10-15 08:30:05Z"))
        );
        let properties = document
            .get("Properties")
            .and_then(DocumentValue::as_document)
            .ok_or("no properties")?;
        assert_eq!(properties.get("Pct"), Some(&DocumentValue::Int32(93)));
        Ok(())
    }

    #[test]
    fn strings_and_names_are_rewritten() -> Result<(), String> {
        let event = LogEvent::at_utc(at_utc()?, LogLevel::Information, "v{Version}.")
            .with_property("App.Version", "1.2.$beta")
            .with_property(
                "Tags",
                LogValue::Dictionary(vec![
                    (ScalarValue::from("a.b"), LogValue::from(true)),
                    (ScalarValue::Null, LogValue::from(1)),
                ]),
            );

        let document = LegacyFormatter.format(&event);

        assert_eq!(document.get("MessageTemplate"), Some(&DocumentValue::from("v{Version}-")));
        let properties = document
            .get("Properties")
            .and_then(DocumentValue::as_document)
            .ok_or("no properties")?;
        assert_eq!(properties.get("App-Version"), Some(&DocumentValue::from("1-2-_beta")));
        let tags = properties
            .get("Tags")
            .and_then(DocumentValue::as_document)
            .ok_or("no tags")?;
        assert_eq!(tags.keys().collect::<Vec<_>>(), ["a-b", "[NULL]"]);
        Ok(())
    }

    #[test]
    fn property_timestamps_stay_text() -> Result<(), String> {
        let offset = FixedOffset::east_opt(2 * 3600).ok_or("offset")?;
        let event = LogEvent::at_utc(at_utc()?, LogLevel::Debug, "tick")
            .with_property("Utc", at_utc()?)
            .with_property("Local", at_utc()?.with_timezone(&offset));

        let document = LegacyFormatter.format(&event);
        let properties = document
            .get("Properties")
            .and_then(DocumentValue::as_document)
            .ok_or("no properties")?;

        assert_eq!(
            properties.get("Utc"),
            Some(&DocumentValue::from("2022-10-15T08:30:05.2500000Z"))
        );
        assert_eq!(
            properties.get("Local"),
            Some(&DocumentValue::from("2022-10-15T10:30:05.2500000+02:00"))
        );
        Ok(())
    }

    #[test]
    fn formatted_holes_are_listed_under_renderings() -> Result<(), String> {
        let event = LogEvent::at_utc(at_utc()?, LogLevel::Information, "{Name:l} {Name,5:u} {Count}")
            .with_property("Name", "ann")
            .with_property("Count", 2);

        let document = LegacyFormatter.format(&event);
        let renderings = document
            .get("Renderings")
            .and_then(DocumentValue::as_document)
            .ok_or("no renderings")?;

        assert_eq!(renderings.keys().collect::<Vec<_>>(), ["Name"]);
        let Some(DocumentValue::Array(entries)) = renderings.get("Name") else {
            return Err("renderings are not an array".to_owned());
        };
        let pairs: Vec<_> = entries
            .iter()
            .filter_map(DocumentValue::as_document)
            .map(|entry| {
                (
                    entry.get("Format").and_then(DocumentValue::as_str),
                    entry.get("Rendering").and_then(DocumentValue::as_str),
                )
            })
            .collect();
        assert_eq!(pairs, [(Some("l"), Some("ann")), (Some("u"), Some("  ann"))]);
        Ok(())
    }

    #[test]
    fn exceptions_are_stored_as_text() -> Result<(), String> {
        let exception = ExceptionInfo::new("System.InvalidOperationException", "outer")
            .with_inner(ExceptionInfo::new("IoError", "disk"))
            .with_stack_trace("at Main()");
        let event =
            LogEvent::at_utc(at_utc()?, LogLevel::Error, "failed").with_exception(exception);

        let document = LegacyFormatter.format(&event);

        assert_eq!(
            document.get("Exception").and_then(DocumentValue::as_str),
            Some(
                "System-InvalidOperationException: outer ---> IoError: disk\n   --- End of inner \
                 exception stack trace ---\nat Main()"
            )
        );
        assert!(!document.contains_key("Properties"));
        Ok(())
    }
}
