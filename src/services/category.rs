//! Category service
//!
//! CRUD over the persisted category list plus the read path that wires the
//! engine together: working entries and categories are pulled from the
//! store, narrowed by the entry filter, classified and aggregated into
//! display statistics.

use tracing::debug;

use crate::engine::{aggregate, classify, pipeline};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Category, CategoryStats, EntryFilter, Transaction};
use crate::store::{keys, KeyedStore};

/// A transaction paired with its resolved category, owned for presentation
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntry {
    pub entry: Transaction,
    pub category: Option<Category>,
}

/// Service for category management and derived statistics
pub struct CategoryService<'a> {
    store: &'a KeyedStore,
}

impl<'a> CategoryService<'a> {
    /// Create a new category service
    pub fn new(store: &'a KeyedStore) -> Self {
        Self { store }
    }

    /// List all categories in priority order
    pub fn list(&self) -> Vec<Category> {
        self.store.get(keys::CATEGORIES).unwrap_or_default()
    }

    /// Insert or update a category
    ///
    /// An update replaces the prior record with the same id in place, so the
    /// priority order of the collection is preserved.
    pub fn save(&self, category: Category) -> LedgerResult<()> {
        category.validate()?;
        let mut categories = self.list();
        match categories.iter().position(|c| c.id == category.id) {
            Some(index) => categories[index] = category,
            None => categories.push(category),
        }
        self.store.set(keys::CATEGORIES, &categories)
    }

    /// Delete a category by id
    ///
    /// Transactions are untouched; anything the category matched falls back
    /// to the uncategorized bucket.
    pub fn delete(&self, category_id: &str) -> LedgerResult<()> {
        let mut categories = self.list();
        let before = categories.len();
        categories.retain(|c| c.id != category_id);
        if categories.len() == before {
            return Err(LedgerError::category_not_found(category_id));
        }
        self.store.set(keys::CATEGORIES, &categories)
    }

    /// The active entry filter
    pub fn entry_filter(&self) -> EntryFilter {
        self.store.get(keys::ENTRY_FILTER).unwrap_or_default()
    }

    /// Persist a changed entry filter
    pub fn save_entry_filter(&self, filter: &EntryFilter) -> LedgerResult<()> {
        self.store.set(keys::ENTRY_FILTER, filter)
    }

    /// Statistics for every category over the filtered transaction set
    ///
    /// Includes excluded categories and, when unmatched transactions exist,
    /// the synthetic uncategorized bucket; ordered most negative first.
    /// Presentation drops `is_excluded` records from top-level badges.
    pub fn stats(&self) -> Vec<CategoryStats> {
        let entries: Vec<Transaction> = self.store.get(keys::ENTRIES).unwrap_or_default();
        let categories = self.list();
        let filter = self.entry_filter();

        let classified = classify(&entries, &categories);
        let filtered = pipeline::apply(classified, &filter);
        let stats = aggregate(&filtered, &categories);
        debug!(
            entries = entries.len(),
            filtered = filtered.len(),
            categories = categories.len(),
            "Computed category statistics"
        );
        stats
    }

    /// The filtered transaction set with resolved categories, for display
    pub fn filtered_entries(&self) -> Vec<ResolvedEntry> {
        let entries: Vec<Transaction> = self.store.get(keys::ENTRIES).unwrap_or_default();
        let categories = self.list();
        let filter = self.entry_filter();

        let classified = classify(&entries, &categories);
        pipeline::apply(classified, &filter)
            .into_iter()
            .map(|c| ResolvedEntry {
                entry: c.entry.clone(),
                category: c.category.cloned(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FilterOptions, LedgerDate, Money, UNCATEGORIZED_ID};

    fn transaction(date: &str, description: &str, value_cents: i64) -> Transaction {
        Transaction {
            date: LedgerDate::parse(date).unwrap(),
            recipient_sender: "ACME".into(),
            kind: "Lastschrift".into(),
            description: description.into(),
            balance: Money::zero(),
            value: Money::from_cents(value_cents),
            currency: "EUR".into(),
        }
    }

    fn keyword_category(name: &str, keyword: &str) -> Category {
        let mut category = Category::new(name, "#fff");
        category.filter_options = FilterOptions {
            includes_one_of: vec![keyword.into()],
            includes_all_of: vec![],
        };
        category
    }

    #[test]
    fn test_save_replaces_in_place() {
        let store = KeyedStore::in_memory();
        let service = CategoryService::new(&store);

        let first = keyword_category("Groceries", "rewe");
        let second = keyword_category("Streaming", "netflix");
        service.save(first.clone()).unwrap();
        service.save(second).unwrap();

        // Updating the first category must not move it to the back, its
        // position is its classification priority
        let mut updated = first;
        updated.name = "Supermarkets".into();
        service.save(updated).unwrap();

        let categories = service.list();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].name, "Supermarkets");
    }

    #[test]
    fn test_save_validates() {
        let store = KeyedStore::in_memory();
        let service = CategoryService::new(&store);
        assert!(service.save(Category::new("", "#fff")).is_err());
    }

    #[test]
    fn test_delete_leaves_transactions_uncategorized() {
        let store = KeyedStore::in_memory();
        let service = CategoryService::new(&store);

        let category = keyword_category("Groceries", "rewe");
        let category_id = category.id.clone();
        service.save(category).unwrap();
        store
            .set(keys::ENTRIES, &vec![transaction("01.03.2024", "REWE", -4200)])
            .unwrap();

        service.delete(&category_id).unwrap();
        assert!(service.list().is_empty());

        let stats = service.stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].id, UNCATEGORIZED_ID);
        assert_eq!(stats[0].amount_of_entries, 1);
    }

    #[test]
    fn test_delete_unknown_category_fails() {
        let store = KeyedStore::in_memory();
        let service = CategoryService::new(&store);
        assert!(service.delete("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_stats_respect_entry_filter() {
        let store = KeyedStore::in_memory();
        let service = CategoryService::new(&store);

        service.save(keyword_category("Groceries", "rewe")).unwrap();
        store
            .set(
                keys::ENTRIES,
                &vec![
                    transaction("01.03.2024", "REWE", -4200),
                    transaction("01.03.2024", "Gehalt", 200000),
                ],
            )
            .unwrap();

        // Earnings are excluded by default
        let stats = service.stats();
        let total: usize = stats.iter().map(|s| s.amount_of_entries).sum();
        assert_eq!(total, 1);

        let mut filter = service.entry_filter();
        filter.include_earnings = true;
        service.save_entry_filter(&filter).unwrap();
        let stats = service.stats();
        let total: usize = stats.iter().map(|s| s.amount_of_entries).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_filtered_entries_resolve_categories() {
        let store = KeyedStore::in_memory();
        let service = CategoryService::new(&store);

        service.save(keyword_category("Groceries", "rewe")).unwrap();
        store
            .set(
                keys::ENTRIES,
                &vec![
                    transaction("01.03.2024", "REWE", -4200),
                    transaction("02.03.2024", "Mystery", -100),
                ],
            )
            .unwrap();

        let resolved = service.filtered_entries();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].category.as_ref().unwrap().name, "Groceries");
        assert!(resolved[1].category.is_none());
    }
}
