//! Persisted view criteria narrowing the active transaction set
//!
//! The entry filter survives reloads and is part of a session bundle. Month
//! bounds are optional; on the wire an unset bound is the empty string, which
//! is what the month selector of the original UI produced for "All".

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::date::Month;

/// View/query state applied before classification and aggregation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryFilter {
    /// Inclusive lower month bound
    #[serde(default, with = "optional_month")]
    pub start_month: Option<Month>,

    /// Inclusive upper month bound
    #[serde(default, with = "optional_month")]
    pub end_month: Option<Month>,

    /// When false, transactions with non-negative value are excluded
    #[serde(default)]
    pub include_earnings: bool,

    /// Category ids currently suppressed from display; may contain the
    /// sentinel id "uncategorized"
    #[serde(default)]
    pub hidden_categories: BTreeSet<String>,
}

mod optional_month {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::models::date::Month;

    pub fn serialize<S: Serializer>(
        month: &Option<Month>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match month {
            Some(m) => serializer.serialize_str(&m.to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Month>, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        match s.as_deref() {
            None | Some("") => Ok(None),
            Some(text) => Month::parse(text)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unbounded_expenses_only() {
        let filter = EntryFilter::default();
        assert!(filter.start_month.is_none());
        assert!(filter.end_month.is_none());
        assert!(!filter.include_earnings);
        assert!(filter.hidden_categories.is_empty());
    }

    #[test]
    fn test_wire_round_trip() {
        let mut filter = EntryFilter {
            start_month: Some(Month::parse("02.2024").unwrap()),
            end_month: None,
            include_earnings: true,
            hidden_categories: BTreeSet::new(),
        };
        filter.hidden_categories.insert("uncategorized".into());

        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["startMonth"], "02.2024");
        assert_eq!(json["endMonth"], "");
        assert_eq!(json["includeEarnings"], true);

        let back: EntryFilter = serde_json::from_value(json).unwrap();
        assert_eq!(back, filter);
    }

    #[test]
    fn test_deserialize_missing_fields() {
        let filter: EntryFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(filter, EntryFilter::default());
    }

    #[test]
    fn test_deserialize_invalid_month_fails() {
        let result = serde_json::from_str::<EntryFilter>(r#"{"startMonth": "13.2024"}"#);
        assert!(result.is_err());
    }
}
