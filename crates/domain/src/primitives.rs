//! Validated identifiers for storage targets.

use mongo_log_sink_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum byte length accepted for a collection name.
pub const MAX_COLLECTION_NAME_BYTES: usize = 255;
/// Maximum byte length accepted for a database name.
pub const MAX_DATABASE_NAME_BYTES: usize = 63;

const DATABASE_NAME_FORBIDDEN: &[char] = &['/', '\\', '.', ' ', '"', '$', '*', '<', '>', ':', '|', '?', '\0'];

/// Domain validation errors for primitive types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// `CollectionName` is empty after trimming.
    EmptyCollectionName {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// `CollectionName` violates the server naming rules.
    InvalidCollectionName {
        /// Trimmed collection name that failed validation.
        input: String,
        /// Rule that was violated.
        reason: &'static str,
    },
    /// `DatabaseName` is empty or violates the server naming rules.
    InvalidDatabaseName {
        /// Trimmed database name that failed validation.
        input: String,
        /// Rule that was violated.
        reason: &'static str,
    },
    /// A rolling interval code or name is outside the supported set.
    UnknownRollingInterval {
        /// Raw value provided.
        input: String,
    },
    /// A derived (rolled) collection name is invalid (invariant violation).
    DerivedCollectionNameInvalid {
        /// Candidate collection name that failed validation.
        candidate: String,
    },
}

impl PrimitiveError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyCollectionName { .. }
            | Self::InvalidCollectionName { .. }
            | Self::DerivedCollectionNameInvalid { .. } => {
                ErrorCode::new("domain", "invalid_collection_name")
            },
            Self::InvalidDatabaseName { .. } => ErrorCode::new("domain", "invalid_database_name"),
            Self::UnknownRollingInterval { .. } => {
                ErrorCode::new("domain", "invalid_rolling_interval")
            },
        }
    }

    const fn is_invariant(&self) -> bool {
        matches!(self, Self::DerivedCollectionNameInvalid { .. })
    }
}

impl fmt::Display for PrimitiveError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCollectionName { .. } => {
                formatter.write_str("CollectionName must be non-empty")
            },
            Self::InvalidCollectionName { reason, .. } => {
                write!(formatter, "CollectionName {reason}")
            },
            Self::InvalidDatabaseName { reason, .. } => write!(formatter, "DatabaseName {reason}"),
            Self::UnknownRollingInterval { input } => write!(
                formatter,
                "rolling interval `{input}` is not one of none, year, month, day, hour, minute"
            ),
            Self::DerivedCollectionNameInvalid { .. } => {
                formatter.write_str("Derived collection name is invalid (this is a bug).")
            },
        }
    }
}

impl std::error::Error for PrimitiveError {}

impl From<PrimitiveError> for ErrorEnvelope {
    fn from(error: PrimitiveError) -> Self {
        let mut envelope = if error.is_invariant() {
            Self::invariant(error.error_code(), error.to_string())
        } else {
            Self::expected(error.error_code(), error.to_string())
        };

        match error {
            PrimitiveError::EmptyCollectionName { input_length } => {
                envelope = envelope.with_metadata("input_length", input_length.to_string());
            },
            PrimitiveError::InvalidCollectionName { input, .. }
            | PrimitiveError::InvalidDatabaseName { input, .. }
            | PrimitiveError::UnknownRollingInterval { input } => {
                envelope = envelope.with_metadata("input", input);
            },
            PrimitiveError::DerivedCollectionNameInvalid { candidate } => {
                envelope = envelope.with_metadata("candidate", candidate);
            },
        }

        envelope
    }
}

/// Name of a collection that log documents are written to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionName(Box<str>);

impl CollectionName {
    /// Parse a collection name accepted by the server.
    ///
    /// Rejects empty names, `$`, NUL, and the reserved `system.` prefix.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        let Some(trimmed) = trimmed_non_empty(raw) else {
            return Err(PrimitiveError::EmptyCollectionName {
                input_length: raw.len(),
            });
        };

        if let Some(reason) = collection_name_violation(trimmed) {
            return Err(PrimitiveError::InvalidCollectionName {
                input: trimmed.to_owned(),
                reason,
            });
        }

        Ok(Self(trimmed.into()))
    }

    /// Access the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CollectionName {
    type Error = PrimitiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CollectionName> for String {
    fn from(value: CollectionName) -> Self {
        value.0.into_string()
    }
}

impl AsRef<str> for CollectionName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Name of the database holding the log collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatabaseName(Box<str>);

impl DatabaseName {
    /// Parse a database name accepted by the server.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        let invalid = |reason| PrimitiveError::InvalidDatabaseName {
            input: raw.trim().to_owned(),
            reason,
        };
        let Some(trimmed) = trimmed_non_empty(raw) else {
            return Err(invalid("must be non-empty"));
        };
        if trimmed.len() > MAX_DATABASE_NAME_BYTES {
            return Err(invalid("must be at most 63 bytes"));
        }
        if trimmed.contains(DATABASE_NAME_FORBIDDEN) {
            return Err(invalid("must not contain /\\. \"$*<>:|? or NUL"));
        }
        Ok(Self(trimmed.into()))
    }

    /// Access the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DatabaseName {
    type Error = PrimitiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DatabaseName> for String {
    fn from(value: DatabaseName) -> Self {
        value.0.into_string()
    }
}

impl fmt::Display for DatabaseName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

fn trimmed_non_empty(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn collection_name_violation(name: &str) -> Option<&'static str> {
    if name.len() > MAX_COLLECTION_NAME_BYTES {
        Some("must be at most 255 bytes")
    } else if name.contains('$') {
        Some("must not contain `$`")
    } else if name.contains('\0') {
        Some("must not contain NUL")
    } else if name.starts_with("system.") {
        Some("must not use the reserved `system.` prefix")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_name_trims_and_accepts_dots() -> Result<(), PrimitiveError> {
        let name = CollectionName::parse("  app.log ")?;
        assert_eq!(name.as_str(), "app.log");
        Ok(())
    }

    #[test]
    fn collection_name_rejects_reserved_shapes() {
        assert!(matches!(
            CollectionName::parse(""),
            Err(PrimitiveError::EmptyCollectionName { input_length: 0 })
        ));
        assert!(matches!(
            CollectionName::parse("a$b"),
            Err(PrimitiveError::InvalidCollectionName { .. })
        ));
        assert!(matches!(
            CollectionName::parse("system.profile"),
            Err(PrimitiveError::InvalidCollectionName { .. })
        ));
        assert!(CollectionName::parse("x".repeat(256)).is_err());
    }

    #[test]
    fn database_name_rules() {
        assert!(DatabaseName::parse("logs").is_ok());
        assert!(DatabaseName::parse("my.db").is_err());
        assert!(DatabaseName::parse(" ").is_err());
        assert!(DatabaseName::parse("d".repeat(64)).is_err());
    }

    #[test]
    fn collection_name_deserializes_through_validation() {
        let ok: Result<CollectionName, _> = serde_json::from_str("\"log\"");
        assert!(ok.is_ok());
        let bad: Result<CollectionName, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }
}
