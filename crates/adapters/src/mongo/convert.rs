//! Conversion between the sink's document model and BSON.

use bson::{Bson, Document as BsonDocument};
use mongo_log_sink_domain::{Document, DocumentValue};

/// Convert a sink document into a BSON document, preserving field order.
#[must_use]
pub fn to_bson_document(document: Document) -> BsonDocument {
    document
        .into_iter()
        .map(|(name, value)| (name, to_bson_value(value)))
        .collect()
}

/// Convert a single document value.
#[must_use]
pub fn to_bson_value(value: DocumentValue) -> Bson {
    match value {
        DocumentValue::Null => Bson::Null,
        DocumentValue::Bool(value) => Bson::Boolean(value),
        DocumentValue::Int32(value) => Bson::Int32(value),
        DocumentValue::Int64(value) => Bson::Int64(value),
        DocumentValue::Double(value) => Bson::Double(value),
        DocumentValue::String(value) => Bson::String(value),
        DocumentValue::DateTime(value) => Bson::DateTime(bson::DateTime::from_chrono(value)),
        DocumentValue::Document(document) => Bson::Document(to_bson_document(document)),
        DocumentValue::Array(items) => Bson::Array(items.into_iter().map(to_bson_value).collect()),
    }
}

/// Direction of an index key: `1`/`-1` for ordered keys, `0` for special
/// index kinds (`"text"`, `"2dsphere"`, ...).
#[must_use]
pub fn index_direction(value: &Bson) -> i32 {
    let direction = match value {
        Bson::Int32(value) => f64::from(*value),
        Bson::Int64(value) => {
            if *value < 0 {
                -1.0
            } else {
                1.0
            }
        },
        Bson::Double(value) => *value,
        _ => return 0,
    };
    if direction < 0.0 { -1 } else { 1 }
}
