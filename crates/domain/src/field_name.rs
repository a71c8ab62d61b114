//! Field-name sanitization for stored documents.
//!
//! The server reserves `.` (path separator) and `$` (operator prefix) in
//! field names. Every property and exception key is rewritten before it is
//! written: `.` becomes `-`, `$` becomes `_`, and a missing name becomes
//! [`NULL_FIELD_NAME`].

use std::borrow::Cow;
use std::fmt;

/// Sentinel used when a field name is absent.
pub const NULL_FIELD_NAME: &str = "[NULL]";

/// Rewrite a possibly-absent field name into a storable one.
#[must_use]
pub fn sanitize_field_name(name: Option<&str>) -> Cow<'_, str> {
    let Some(name) = name else {
        return Cow::Borrowed(NULL_FIELD_NAME);
    };
    if name.contains(['.', '$']) {
        Cow::Owned(name.replace('.', "-").replace('$', "_"))
    } else {
        Cow::Borrowed(name)
    }
}

/// A field name that never contains `.` or `$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SanitizedFieldName(Box<str>);

impl SanitizedFieldName {
    /// Sanitize an optional raw name.
    #[must_use]
    pub fn new(name: Option<&str>) -> Self {
        Self(sanitize_field_name(name).into())
    }

    /// Access the sanitized name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into an owned string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0.into_string()
    }
}

impl From<&str> for SanitizedFieldName {
    fn from(value: &str) -> Self {
        Self::new(Some(value))
    }
}

impl AsRef<str> for SanitizedFieldName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for SanitizedFieldName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
