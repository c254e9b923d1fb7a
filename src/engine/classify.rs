//! Transaction classification
//!
//! Assigns each transaction to at most one category. Categories are tested
//! in their stored order and the first match wins; the category collection
//! is effectively a priority list, and reordering it changes classification
//! results. This is intentional and must stay a linear first-match scan.

use crate::models::{Category, Transaction};

use super::rule;

/// A transaction together with its resolved category, if any
#[derive(Debug, Clone, Copy)]
pub struct Classified<'a> {
    pub entry: &'a Transaction,
    pub category: Option<&'a Category>,
}

impl<'a> Classified<'a> {
    /// The resolved category id, or `None` for the uncategorized bucket
    pub fn category_id(&self) -> Option<&'a str> {
        self.category.map(|c| c.id.as_str())
    }
}

/// Find the first category whose rules match `entry`
pub fn find_category_for<'a>(
    entry: &Transaction,
    categories: &'a [Category],
) -> Option<&'a Category> {
    categories
        .iter()
        .find(|category| rule::matches(entry, category))
}

/// Classify every transaction against the category priority list
pub fn classify<'a>(
    entries: &'a [Transaction],
    categories: &'a [Category],
) -> Vec<Classified<'a>> {
    entries
        .iter()
        .map(|entry| Classified {
            entry,
            category: find_category_for(entry, categories),
        })
        .collect()
}
