//! Category model and derived statistics
//!
//! A category is a user-defined bucket with a matching rule. The rule has
//! three forms that are combined with logical OR: a free-text boolean
//! expression (`filter`) and the two simpler list forms in `filter_options`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::Money;
use crate::error::{LedgerError, LedgerResult};

/// Sentinel id of the synthetic bucket for unmatched transactions
///
/// Never persisted as a real category; also usable inside
/// `EntryFilter::hidden_categories` to suppress unmatched transactions.
pub const UNCATEGORIZED_ID: &str = "uncategorized";

/// Simple list-based rule forms, an alternative to the `filter` expression
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    /// Match when the transaction contains at least one of these keys
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes_one_of: Vec<String>,

    /// Match when the transaction contains every one of these keys
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes_all_of: Vec<String>,
}

impl FilterOptions {
    /// True when neither list carries any keys
    pub fn is_empty(&self) -> bool {
        self.includes_one_of.is_empty() && self.includes_all_of.is_empty()
    }
}

/// A user-defined transaction bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Stable identifier, generated once and never reused
    pub id: String,

    /// Display name
    pub name: String,

    /// Display color (any CSS color string)
    pub color: String,

    /// Free-text boolean rule expression, may be empty
    #[serde(default)]
    pub filter: String,

    /// Simpler list-based rule forms, ORed with `filter`
    #[serde(default)]
    pub filter_options: FilterOptions,

    /// Excluded categories are omitted from top-level stats but still computed
    #[serde(default)]
    pub is_excluded: bool,
}

impl Category {
    /// Create a new category with a fresh id and no rules
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            color: color.into(),
            filter: String::new(),
            filter_options: FilterOptions::default(),
            is_excluded: false,
        }
    }

    /// Validate display metadata and the id
    pub fn validate(&self) -> LedgerResult<()> {
        if self.id.trim().is_empty() {
            return Err(LedgerError::Validation("Category id cannot be empty".into()));
        }
        if self.id == UNCATEGORIZED_ID {
            return Err(LedgerError::Validation(format!(
                "Category id \"{}\" is reserved",
                UNCATEGORIZED_ID
            )));
        }
        if self.name.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Category name cannot be empty".into(),
            ));
        }
        if self.color.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Category color cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Display statistics for one category, rebuilt on every relevant change
///
/// Derived data, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub id: String,
    pub name: String,
    pub color: String,
    pub is_excluded: bool,

    /// Sum of transaction values in this category
    pub total_balance: Money,

    /// `total_balance` as a de-DE currency string
    pub total_balance_formatted: String,

    /// Monthly average of `total_balance`, formatted; 0 when no months
    pub average_balance_per_month: String,

    /// Number of transactions in this category
    pub amount_of_entries: usize,

    /// Monthly average transaction count; 0 when no months
    pub average_amount_per_month: f64,

    /// Share of the overall sum; 0 when the overall sum is zero
    pub percent_of_total: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_category_has_unique_id() {
        let a = Category::new("Groceries", "#ff0000");
        let b = Category::new("Groceries", "#ff0000");
        assert_ne!(a.id, b.id);
        assert!(a.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_metadata() {
        let mut cat = Category::new("", "#fff");
        assert!(cat.validate().is_err());

        cat.name = "Rent".into();
        cat.color = "  ".into();
        assert!(cat.validate().is_err());

        cat.color = "#fff".into();
        assert!(cat.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_reserved_id() {
        let mut cat = Category::new("Sneaky", "#000");
        cat.id = UNCATEGORIZED_ID.into();
        assert!(cat.validate().is_err());
    }

    #[test]
    fn test_deserialize_original_shape() {
        let json = r##"{
            "id": "c1",
            "name": "Groceries",
            "color": "#00ff00",
            "filter": "includes(\"rewe\") or includes(\"edeka\")",
            "filterOptions": {"includesOneOf": ["aldi"]},
            "isExcluded": false
        }"##;
        let cat: Category = serde_json::from_str(json).unwrap();
        assert_eq!(cat.filter_options.includes_one_of, vec!["aldi"]);
        assert!(!cat.filter_options.is_empty());

        // filter and filterOptions may be absent entirely
        let bare: Category =
            serde_json::from_str(r##"{"id": "c2", "name": "Rest", "color": "#333"}"##).unwrap();
        assert!(bare.filter.is_empty());
        assert!(bare.filter_options.is_empty());
    }
}
