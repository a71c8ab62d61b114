//! Exception → document serialization.

use crate::value_sanitizer::ValueSanitizer;
use mongo_log_sink_domain::{Document, DocumentValue, ExceptionInfo};

/// Stored field name for each `ExceptionInfo` member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionFieldMap {
    /// Type discriminator.
    pub type_name: Box<str>,
    /// Message.
    pub message: Box<str>,
    /// Source component.
    pub source: Box<str>,
    /// Stack trace.
    pub stack_trace: Box<str>,
    /// Help link.
    pub help_link: Box<str>,
    /// Numeric result code.
    pub h_result: Box<str>,
    /// Extra data.
    pub data: Box<str>,
    /// Direct cause.
    pub inner_exception: Box<str>,
    /// Sibling causes.
    pub inner_exceptions: Box<str>,
}

impl Default for ExceptionFieldMap {
    fn default() -> Self {
        Self {
            type_name: "_t".into(),
            message: "Message".into(),
            source: "Source".into(),
            stack_trace: "StackTrace".into(),
            help_link: "HelpLink".into(),
            h_result: "HResult".into(),
            data: "Data".into(),
            inner_exception: "InnerException".into(),
            inner_exceptions: "InnerExceptions".into(),
        }
    }
}

/// Turns an [`ExceptionInfo`] into a document using a fixed field map.
///
/// Absent members are omitted. `Data` values go through the value
/// sanitizer, but `Data` keys are written as given; run the result through
/// [`crate::sanitize_document`] before storing it.
#[derive(Debug, Clone, Default)]
pub struct ExceptionSerializer {
    fields: ExceptionFieldMap,
    values: ValueSanitizer,
}

impl ExceptionSerializer {
    /// Create a serializer.
    #[must_use]
    pub const fn new(fields: ExceptionFieldMap, values: ValueSanitizer) -> Self {
        Self { fields, values }
    }

    /// The field map in use.
    #[must_use]
    pub const fn field_map(&self) -> &ExceptionFieldMap {
        &self.fields
    }

    /// Serialize an exception and its causes.
    #[must_use]
    pub fn serialize(&self, exception: &ExceptionInfo) -> Document {
        let fields = &self.fields;
        let mut document = Document::new();
        document.insert(fields.type_name.as_ref(), exception.type_name.as_str());
        document.insert(fields.message.as_ref(), exception.message.as_str());
        insert_text(&mut document, &fields.source, exception.source.as_deref());
        insert_text(&mut document, &fields.stack_trace, exception.stack_trace.as_deref());
        insert_text(&mut document, &fields.help_link, exception.help_link.as_deref());
        if let Some(h_result) = exception.h_result {
            document.insert(fields.h_result.as_ref(), h_result);
        }
        if !exception.data.is_empty() {
            let data: Document = exception
                .data
                .iter()
                .map(|(key, value)| (key.as_str(), self.values.convert(value)))
                .collect();
            document.insert(fields.data.as_ref(), data);
        }
        if let Some(inner) = exception.inner.as_deref() {
            document.insert(fields.inner_exception.as_ref(), self.serialize(inner));
        }
        if !exception.inner_exceptions.is_empty() {
            let inner = exception
                .inner_exceptions
                .iter()
                .map(|inner| DocumentValue::Document(self.serialize(inner)))
                .collect::<Vec<_>>();
            document.insert(fields.inner_exceptions.as_ref(), inner);
        }
        document
    }
}

fn insert_text(document: &mut Document, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        document.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongo_log_sink_domain::LogValue;

    #[test]
    fn absent_members_are_omitted() {
        let document =
            ExceptionSerializer::default().serialize(&ExceptionInfo::new("IoError", "disk full"));
        assert_eq!(document.keys().collect::<Vec<_>>(), ["_t", "Message"]);
        assert_eq!(document.get("_t"), Some(&DocumentValue::from("IoError")));
    }

    #[test]
    fn causes_nest_recursively() -> Result<(), Box<dyn std::error::Error>> {
        let mut aggregate = ExceptionInfo::new("AggregateError", "two failures")
            .with_inner(ExceptionInfo::new("Timeout", "first").with_stack_trace("at connect"));
        aggregate.inner_exceptions = vec![
            ExceptionInfo::new("Timeout", "first"),
            ExceptionInfo::new("Refused", "second"),
        ];
        aggregate.h_result = Some(-2_146_233_088);

        let document = ExceptionSerializer::default().serialize(&aggregate);
        let inner = document
            .get("InnerException")
            .and_then(DocumentValue::as_document);
        assert_eq!(
            inner.and_then(|inner| inner.get("StackTrace")),
            Some(&DocumentValue::from("at connect"))
        );
        assert_eq!(document.get("HResult"), Some(&DocumentValue::Int32(-2_146_233_088)));
        let Some(DocumentValue::Array(items)) = document.get("InnerExceptions") else {
            return Err("InnerExceptions should be an array".into());
        };
        assert_eq!(items.len(), 2);
        Ok(())
    }

    #[test]
    fn data_keys_stay_raw_and_values_are_converted() {
        let exception = ExceptionInfo::new("Error", "bad")
            .with_data("Inner.Value", LogValue::from(5_i64))
            .with_data("list", LogValue::sequence([LogValue::from("a")]));

        let document = ExceptionSerializer::default().serialize(&exception);
        let data = document.get("Data").and_then(DocumentValue::as_document);
        assert_eq!(
            data.and_then(|data| data.get("Inner.Value")),
            Some(&DocumentValue::Int32(5))
        );
        assert_eq!(
            data.and_then(|data| data.get("list")),
            Some(&DocumentValue::Array(vec![DocumentValue::from("a")]))
        );
    }

    #[test]
    fn custom_field_map_renames_members() {
        let fields = ExceptionFieldMap {
            type_name: "Type".into(),
            ..ExceptionFieldMap::default()
        };
        let serializer = ExceptionSerializer::new(fields, ValueSanitizer::default());
        let document = serializer.serialize(&ExceptionInfo::new("Error", "bad"));
        assert!(document.contains_key("Type"));
        assert!(!document.contains_key("_t"));
        assert_eq!(serializer.field_map().message.as_ref(), "Message");
    }
}
