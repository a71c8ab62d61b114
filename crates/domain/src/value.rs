//! Dynamically-typed property values carried by log events.

use chrono::{DateTime, FixedOffset, SecondsFormat, TimeDelta, Utc};
use std::fmt;
use url::Url;
use uuid::Uuid;

/// A scalar (leaf) property value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// 32-bit signed integer.
    I32(i32),
    /// 64-bit signed integer.
    I64(i64),
    /// 64-bit unsigned integer.
    U64(u64),
    /// Double precision float.
    F64(f64),
    /// Single character.
    Char(char),
    /// Text.
    String(String),
    /// Instant in UTC.
    Timestamp(DateTime<Utc>),
    /// Instant with a fixed UTC offset.
    OffsetTimestamp(DateTime<FixedOffset>),
    /// Signed elapsed time.
    Duration(TimeDelta),
    /// Absolute URI.
    Uri(Url),
    /// 128-bit identifier.
    Guid(Uuid),
}

impl ScalarValue {
    /// Text form used for dictionary keys; `None` for [`ScalarValue::Null`].
    #[must_use]
    pub fn to_string_or_null(&self) -> Option<String> {
        match self {
            Self::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => formatter.write_str("null"),
            Self::Bool(value) => write!(formatter, "{value}"),
            Self::I32(value) => write!(formatter, "{value}"),
            Self::I64(value) => write!(formatter, "{value}"),
            Self::U64(value) => write!(formatter, "{value}"),
            Self::F64(value) => write!(formatter, "{value}"),
            Self::Char(value) => write!(formatter, "{value}"),
            Self::String(value) => formatter.write_str(value),
            Self::Timestamp(value) => {
                formatter.write_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            },
            Self::OffsetTimestamp(value) => {
                formatter.write_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, false))
            },
            Self::Duration(value) => formatter.write_str(&format_duration(*value)),
            Self::Uri(value) => formatter.write_str(value.as_str()),
            Self::Guid(value) => write!(formatter, "{}", value.hyphenated()),
        }
    }
}

macro_rules! scalar_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for ScalarValue {
                fn from(value: $source) -> Self {
                    Self::$variant(value.into())
                }
            }

            impl From<$source> for LogValue {
                fn from(value: $source) -> Self {
                    Self::Scalar(ScalarValue::from(value))
                }
            }
        )*
    };
}

scalar_from!(
    bool => Bool,
    i32 => I32,
    i64 => I64,
    u64 => U64,
    f64 => F64,
    char => Char,
    String => String,
    &str => String,
    DateTime<Utc> => Timestamp,
    DateTime<FixedOffset> => OffsetTimestamp,
    TimeDelta => Duration,
    Url => Uri,
    Uuid => Guid,
);

/// Constant-width elapsed-time text: `[-][d.]hh:mm:ss[.fffffff]`.
///
/// Fractional seconds are printed at 100ns resolution and only when non-zero.
#[must_use]
pub fn format_duration(value: TimeDelta) -> String {
    let negative = value < TimeDelta::zero();
    let magnitude = value.abs();
    let total_seconds = magnitude.num_seconds();
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;
    let ticks = magnitude.subsec_nanos() / 100;

    let mut text = String::new();
    if negative {
        text.push('-');
    }
    if days > 0 {
        text.push_str(&format!("{days}."));
    }
    text.push_str(&format!("{hours:02}:{minutes:02}:{seconds:02}"));
    if ticks > 0 {
        text.push_str(&format!(".{ticks:07}"));
    }
    text
}

/// A structured property value: the closed set of shapes a log event can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum LogValue {
    /// Leaf value.
    Scalar(ScalarValue),
    /// Named properties with an optional type tag, in declaration order.
    Structure {
        /// Optional type tag (e.g. the captured type name).
        type_tag: Option<String>,
        /// Ordered `(name, value)` pairs.
        properties: Vec<(String, LogValue)>,
    },
    /// Key/value pairs with scalar keys, in insertion order.
    Dictionary(Vec<(ScalarValue, LogValue)>),
    /// Ordered elements.
    Sequence(Vec<LogValue>),
}

impl LogValue {
    /// Build a structure value.
    pub fn structure<I, K>(type_tag: Option<&str>, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Self)>,
        K: Into<String>,
    {
        Self::Structure {
            type_tag: type_tag.map(str::to_owned),
            properties: properties
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }

    /// Build a dictionary value.
    pub fn dictionary<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Self)>,
        K: Into<ScalarValue>,
    {
        Self::Dictionary(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    /// Build a sequence value.
    pub fn sequence(elements: impl IntoIterator<Item = Self>) -> Self {
        Self::Sequence(elements.into_iter().collect())
    }

    /// Nesting depth: scalars are 1, containers add one level over their deepest child.
    #[must_use]
    pub fn depth(&self) -> usize {
        let children = match self {
            Self::Scalar(_) => return 1,
            Self::Structure { properties, .. } => {
                properties.iter().map(|(_, value)| value.depth()).max()
            },
            Self::Dictionary(entries) => entries.iter().map(|(_, value)| value.depth()).max(),
            Self::Sequence(elements) => elements.iter().map(Self::depth).max(),
        };
        1 + children.unwrap_or(0)
    }
}

impl From<ScalarValue> for LogValue {
    fn from(value: ScalarValue) -> Self {
        Self::Scalar(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_use_constant_width_text() {
        assert_eq!(format_duration(TimeDelta::minutes(30)), "00:30:00");
        assert_eq!(
            format_duration(TimeDelta::days(1) + TimeDelta::seconds(3_723)),
            "1.01:02:03"
        );
        assert_eq!(format_duration(TimeDelta::milliseconds(1_500)), "00:00:01.5000000");
        assert_eq!(format_duration(TimeDelta::seconds(-90)), "-00:01:30");
    }

    #[test]
    fn boxed_scalars_use_canonical_text() -> Result<(), Box<dyn std::error::Error>> {
        let uri = ScalarValue::from(Url::parse("https://example.com/a?b=1")?);
        assert_eq!(uri.to_string(), "https://example.com/a?b=1");

        let offset = DateTime::parse_from_rfc3339("2022-10-15T08:30:00+02:00")?;
        assert_eq!(
            ScalarValue::from(offset).to_string(),
            "2022-10-15T08:30:00+02:00"
        );

        let guid = Uuid::parse_str("6F9619FF-8B86-D011-B42D-00CF4FC964FF")?;
        assert_eq!(
            ScalarValue::from(guid).to_string(),
            "6f9619ff-8b86-d011-b42d-00cf4fc964ff"
        );
        Ok(())
    }

    #[test]
    fn null_has_no_key_text() {
        assert_eq!(ScalarValue::Null.to_string_or_null(), None);
        assert_eq!(ScalarValue::from(7).to_string_or_null().as_deref(), Some("7"));
    }

    #[test]
    fn depth_counts_nesting() {
        let value = LogValue::structure(
            Some("Order"),
            [(
                "Lines",
                LogValue::sequence([LogValue::dictionary([("sku", LogValue::from(1))])]),
            )],
        );
        assert_eq!(value.depth(), 4);
        assert_eq!(LogValue::from("x").depth(), 1);
        assert_eq!(LogValue::sequence([]).depth(), 1);
    }
}
