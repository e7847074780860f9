//! Calendar dates and date windows
//!
//! Dates are ISO calendar dates (`YYYY-MM-DD`). The persisted record writes an
//! unset date as the empty string, which [`empty_as_none`] maps to `None`.

use chrono::NaiveDate;
use serde::Serialize;

/// Format used for every date in the persisted record and CLI
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses an ISO date, treating an empty string as "unset"
pub fn parse_optional(s: &str) -> Result<Option<NaiveDate>, chrono::ParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).map(Some)
}

/// Renders an optional date the way the persisted record does
pub fn format_optional(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// Later of two optional dates; an absent side never wins
pub fn later(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Option<NaiveDate> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Earlier of two optional dates; an absent side never wins
pub fn earlier(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Option<NaiveDate> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// An inclusive window a date may legally take. Open ends are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    #[serde(serialize_with = "empty_as_none::serialize")]
    pub min: Option<NaiveDate>,
    #[serde(serialize_with = "empty_as_none::serialize")]
    pub max: Option<NaiveDate>,
}

impl DateRange {
    /// Returns true if the date lies inside the window
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.min.map_or(true, |min| date >= min) && self.max.map_or(true, |max| date <= max)
    }

    /// Returns true if neither end is constrained
    pub fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Serde adapter for `Option<NaiveDate>` stored as `"YYYY-MM-DD"` or `""`
pub mod empty_as_none {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_optional(*date))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => super::parse_optional(&s).map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn parse_optional_handles_empty() {
        assert_eq!(parse_optional("").unwrap(), None);
        assert_eq!(parse_optional("  ").unwrap(), None);
        assert_eq!(parse_optional("2024-03-01").unwrap(), Some(d("2024-03-01")));
        assert!(parse_optional("03/01/2024").is_err());
    }

    #[test]
    fn later_and_earlier_ignore_absent() {
        let a = Some(d("2024-01-01"));
        let b = Some(d("2024-02-01"));

        assert_eq!(later(a, b), b);
        assert_eq!(later(a, None), a);
        assert_eq!(later(None, None), None);
        assert_eq!(earlier(a, b), a);
        assert_eq!(earlier(None, b), b);
    }

    #[test]
    fn range_contains() {
        let range = DateRange {
            min: Some(d("2024-01-10")),
            max: Some(d("2024-01-20")),
        };
        assert!(range.contains(d("2024-01-10")));
        assert!(range.contains(d("2024-01-20")));
        assert!(!range.contains(d("2024-01-09")));
        assert!(!range.contains(d("2024-01-21")));
        assert!(DateRange::default().contains(d("1999-12-31")));
        assert!(DateRange::default().is_open());
    }

    #[test]
    fn range_serializes_empty_ends() {
        let range = DateRange {
            min: Some(d("2024-01-10")),
            max: None,
        };
        let json = serde_json::to_value(range).unwrap();
        assert_eq!(json, serde_json::json!({"min": "2024-01-10", "max": ""}));
    }
}
