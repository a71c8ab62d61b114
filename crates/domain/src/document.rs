//! Output document model mirroring the storage engine's value types.

use chrono::{DateTime, Utc};

/// A value stored inside a [`Document`].
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentValue {
    /// Null.
    Null,
    /// Boolean.
    Bool(bool),
    /// 32-bit integer.
    Int32(i32),
    /// 64-bit integer.
    Int64(i64),
    /// Double precision float.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// UTC date-time.
    DateTime(DateTime<Utc>),
    /// Embedded document.
    Document(Document),
    /// Array of values.
    Array(Vec<DocumentValue>),
}

impl DocumentValue {
    /// Borrow as an embedded document.
    #[must_use]
    pub const fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(document) => Some(document),
            _ => None,
        }
    }

    /// Borrow as a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for DocumentValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for DocumentValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Document> for DocumentValue {
    fn from(value: Document) -> Self {
        Self::Document(value)
    }
}

macro_rules! document_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for DocumentValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

document_value_from! {
    bool => Bool,
    i32 => Int32,
    i64 => Int64,
    f64 => Double,
    DateTime<Utc> => DateTime,
    Vec<DocumentValue> => Array,
}

/// An ordered name→value mapping.
///
/// Field order is insertion order. Inserting an existing name replaces the
/// value in place, so the name keeps its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: Vec<(String, DocumentValue)>,
}

impl Document {
    /// Create an empty document.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Create an empty document with room for `capacity` fields.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Insert or replace a field, returning the previous value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<DocumentValue>,
    ) -> Option<DocumentValue> {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.get_mut(&name) {
            return Some(std::mem::replace(slot, value));
        }
        self.fields.push((name, value));
        None
    }

    /// Insert only when the name is not present. Returns true when inserted.
    pub fn insert_if_absent(
        &mut self,
        name: impl Into<String>,
        value: impl Into<DocumentValue>,
    ) -> bool {
        let name = name.into();
        if self.contains_key(&name) {
            return false;
        }
        self.fields.push((name, value.into()));
        true
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DocumentValue> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut DocumentValue> {
        self.fields
            .iter_mut()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Returns true if the field exists.
    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the document has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    /// Iterate `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DocumentValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl IntoIterator for Document {
    type Item = (String, DocumentValue);
    type IntoIter = std::vec::IntoIter<(String, DocumentValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<K: Into<String>, V: Into<DocumentValue>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut document = Self::new();
        for (key, value) in iter {
            document.insert(key, value);
        }
        document
    }
}
