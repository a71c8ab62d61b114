//! Log values to storable document values.

use mongo_log_sink_domain::{Document, DocumentValue, LogValue, ScalarValue, sanitize_field_name};

/// What to do when two keys sanitize to the same field name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyCollisionPolicy {
    /// The later entry overwrites the earlier value in place.
    #[default]
    KeepLast,
    /// The first entry wins; later duplicates are dropped.
    KeepFirst,
}

/// Recursive `LogValue` → `DocumentValue` conversion.
///
/// Every name it emits (structure properties, dictionary keys) is sanitized.
/// Nesting is mirrored one-to-one: structures and dictionaries become
/// documents, sequences become arrays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValueSanitizer {
    collisions: KeyCollisionPolicy,
}

impl ValueSanitizer {
    /// Create a sanitizer with the given collision policy.
    #[must_use]
    pub const fn new(collisions: KeyCollisionPolicy) -> Self {
        Self { collisions }
    }

    /// The configured collision policy.
    #[must_use]
    pub const fn collision_policy(&self) -> KeyCollisionPolicy {
        self.collisions
    }

    /// Convert an optional value; absent input yields absent output.
    #[must_use]
    pub fn to_document_value(&self, value: Option<&LogValue>) -> Option<DocumentValue> {
        value.map(|value| self.convert(value))
    }

    /// Convert a value.
    #[must_use]
    pub fn convert(&self, value: &LogValue) -> DocumentValue {
        match value {
            LogValue::Scalar(scalar) => scalar_value(scalar),
            LogValue::Structure { properties, .. } => {
                DocumentValue::Document(self.properties_document(properties))
            },
            LogValue::Dictionary(entries) => {
                let mut document = Document::with_capacity(entries.len());
                for (key, value) in entries {
                    let name = sanitize_field_name(key.to_string_or_null().as_deref()).into_owned();
                    self.put(&mut document, name, self.convert(value));
                }
                DocumentValue::Document(document)
            },
            LogValue::Sequence(elements) => {
                DocumentValue::Array(elements.iter().map(|element| self.convert(element)).collect())
            },
        }
    }

    /// Build a document from named values, sanitizing every name.
    #[must_use]
    pub fn properties_document(&self, properties: &[(String, LogValue)]) -> Document {
        let mut document = Document::with_capacity(properties.len());
        for (name, value) in properties {
            let name = sanitize_field_name(Some(name)).into_owned();
            self.put(&mut document, name, self.convert(value));
        }
        document
    }

    fn put(&self, document: &mut Document, name: String, value: DocumentValue) {
        match self.collisions {
            KeyCollisionPolicy::KeepLast => {
                document.insert(name, value);
            },
            KeyCollisionPolicy::KeepFirst => {
                document.insert_if_absent(name, value);
            },
        }
    }
}

fn scalar_value(scalar: &ScalarValue) -> DocumentValue {
    match scalar {
        ScalarValue::Null => DocumentValue::Null,
        ScalarValue::Bool(value) => DocumentValue::Bool(*value),
        ScalarValue::I32(value) => DocumentValue::Int32(*value),
        ScalarValue::I64(value) => narrow_i64(*value),
        ScalarValue::U64(value) => i64::try_from(*value).map_or_else(
            // Beyond i64 there is no integer BSON type left.
            |_| u64_as_double(*value),
            narrow_i64,
        ),
        ScalarValue::F64(value) => DocumentValue::Double(*value),
        ScalarValue::Char(value) => DocumentValue::String(value.to_string()),
        ScalarValue::String(value) => DocumentValue::String(value.clone()),
        ScalarValue::Timestamp(value) => DocumentValue::DateTime(*value),
        ScalarValue::OffsetTimestamp(_)
        | ScalarValue::Duration(_)
        | ScalarValue::Uri(_)
        | ScalarValue::Guid(_) => DocumentValue::String(scalar.to_string()),
    }
}

pub(crate) fn narrow_i64(value: i64) -> DocumentValue {
    i32::try_from(value).map_or(DocumentValue::Int64(value), DocumentValue::Int32)
}

#[expect(
    clippy::cast_precision_loss,
    reason = "values above i64::MAX are only representable as doubles"
)]
pub(crate) const fn u64_as_double(value: u64) -> DocumentValue {
    DocumentValue::Double(value as f64)
}
