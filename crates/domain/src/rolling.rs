//! Rolling collection names: one physical collection per time window.

use crate::primitives::{CollectionName, PrimitiveError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Time-bucketing policy for collection names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RollingInterval {
    /// A single collection.
    #[default]
    None,
    /// `base_yyyy`
    Year,
    /// `base_yyyyMM`
    Month,
    /// `base_yyyyMMdd`
    Day,
    /// `base_yyyyMMddHH` (24-hour clock)
    Hour,
    /// `base_yyyyMMddHHmm` (24-hour clock)
    Minute,
}

impl RollingInterval {
    /// Every supported interval, in code order.
    pub const ALL: [Self; 6] = [
        Self::None,
        Self::Year,
        Self::Month,
        Self::Day,
        Self::Hour,
        Self::Minute,
    ];

    /// Map a numeric code (`0..=5`) to an interval.
    pub fn from_code(code: u8) -> Result<Self, PrimitiveError> {
        Self::ALL
            .get(usize::from(code))
            .copied()
            .ok_or_else(|| PrimitiveError::UnknownRollingInterval {
                input: code.to_string(),
            })
    }

    /// Lower-case name used in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
        }
    }

    /// `strftime` pattern for the suffix, `None` when not rolling.
    #[must_use]
    pub const fn suffix_pattern(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Year => Some("%Y"),
            Self::Month => Some("%Y%m"),
            Self::Day => Some("%Y%m%d"),
            Self::Hour => Some("%Y%m%d%H"),
            Self::Minute => Some("%Y%m%d%H%M"),
        }
    }
}

impl fmt::Display for RollingInterval {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for RollingInterval {
    type Err = PrimitiveError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if let Ok(code) = trimmed.parse::<u8>() {
            return Self::from_code(code);
        }
        Self::ALL
            .into_iter()
            .find(|interval| interval.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| PrimitiveError::UnknownRollingInterval {
                input: input.to_owned(),
            })
    }
}

/// Physical collection name for `base` at `now`.
///
/// Pure: the same inputs always produce the same name.
#[must_use]
pub fn resolve_collection_name(base: &str, interval: RollingInterval, now: DateTime<Utc>) -> String {
    match interval.suffix_pattern() {
        None => base.to_owned(),
        Some(pattern) => format!("{base}_{}", now.format(pattern)),
    }
}

/// A logical log stream: base name plus rolling policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RollingTarget {
    base_name: CollectionName,
    interval: RollingInterval,
}

impl RollingTarget {
    /// Create a target.
    #[must_use]
    pub const fn new(base_name: CollectionName, interval: RollingInterval) -> Self {
        Self {
            base_name,
            interval,
        }
    }

    /// The logical base name.
    #[must_use]
    pub const fn base_name(&self) -> &CollectionName {
        &self.base_name
    }

    /// The rolling policy.
    #[must_use]
    pub const fn interval(&self) -> RollingInterval {
        self.interval
    }

    /// Resolve the physical collection for `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<CollectionName, PrimitiveError> {
        let candidate = resolve_collection_name(self.base_name.as_str(), self.interval, now);
        CollectionName::parse(&candidate)
            .map_err(|_| PrimitiveError::DerivedCollectionNameInvalid { candidate })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Result<DateTime<Utc>, &'static str> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0)
            .single()
            .ok_or("invalid timestamp")
    }

    #[test]
    fn month_suffix() -> Result<(), Box<dyn std::error::Error>> {
        let now = at(2022, 10, 15, 0, 0)?;
        assert_eq!(resolve_collection_name("log", RollingInterval::Month, now), "log_202210");
        Ok(())
    }

    #[test]
    fn none_returns_base() -> Result<(), Box<dyn std::error::Error>> {
        let now = at(1999, 1, 1, 23, 59)?;
        assert_eq!(resolve_collection_name("log", RollingInterval::None, now), "log");
        Ok(())
    }

    #[test]
    fn every_pattern_is_zero_padded() -> Result<(), Box<dyn std::error::Error>> {
        let now = at(2023, 3, 4, 5, 6)?;
        let names: Vec<_> = [
            RollingInterval::Year,
            RollingInterval::Day,
            RollingInterval::Hour,
            RollingInterval::Minute,
        ]
        .into_iter()
        .map(|interval| resolve_collection_name("log", interval, now))
        .collect();
        assert_eq!(names, ["log_2023", "log_20230304", "log_2023030405", "log_202303040506"]);
        Ok(())
    }

    #[test]
    fn afternoon_hours_use_24_hour_clock() -> Result<(), Box<dyn std::error::Error>> {
        let morning = resolve_collection_name("log", RollingInterval::Hour, at(2023, 3, 4, 1, 0)?);
        let afternoon =
            resolve_collection_name("log", RollingInterval::Hour, at(2023, 3, 4, 13, 0)?);
        assert_eq!(afternoon, "log_2023030413");
        assert_ne!(morning, afternoon);
        Ok(())
    }

    #[test]
    fn codes_outside_the_set_fail() {
        assert_eq!(RollingInterval::from_code(2), Ok(RollingInterval::Month));
        assert!(matches!(
            RollingInterval::from_code(6),
            Err(PrimitiveError::UnknownRollingInterval { .. })
        ));
        assert!("fortnight".parse::<RollingInterval>().is_err());
        assert_eq!("Day".parse::<RollingInterval>(), Ok(RollingInterval::Day));
    }

    #[test]
    fn target_resolves_to_valid_collection() -> Result<(), Box<dyn std::error::Error>> {
        let target = RollingTarget::new(CollectionName::parse("app")?, RollingInterval::Day);
        let name = target.resolve(at(2024, 2, 29, 12, 0)?)?;
        assert_eq!(name.as_str(), "app_20240229");
        Ok(())
    }
}
