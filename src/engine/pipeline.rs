//! Entry filter pipeline
//!
//! Reduces the classified transaction set to the subset relevant for display
//! and statistics, driven by the persisted [`EntryFilter`]. Expenses are
//! always shown; earnings only when opted in. Month bounds are inclusive at
//! month granularity.

use crate::models::{EntryFilter, UNCATEGORIZED_ID};

use super::classify::Classified;

/// Apply the entry filter to a classified transaction set
pub fn apply<'a>(classified: Vec<Classified<'a>>, filter: &EntryFilter) -> Vec<Classified<'a>> {
    let start = filter.start_month.map(|m| m.first_day());
    let end = filter.end_month.map(|m| m.last_day());

    classified
        .into_iter()
        .filter(|c| {
            if !(filter.include_earnings || c.entry.value.is_negative()) {
                return false;
            }
            let date = c.entry.date.as_naive();
            if start.is_some_and(|first| date < first) {
                return false;
            }
            if end.is_some_and(|last| date > last) {
                return false;
            }
            let category_id = c.category_id().unwrap_or(UNCATEGORIZED_ID);
            !filter.hidden_categories.contains(category_id)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::classify::classify;
    use crate::models::{Category, FilterOptions, LedgerDate, Money, Month, Transaction};

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

    fn month_filter(start: &str, end: &str) -> EntryFilter {
        EntryFilter {
            start_month: Some(Month::parse(start).unwrap()),
            end_month: Some(Month::parse(end).unwrap()),
            ..EntryFilter::default()
        }
    }

    #[test]
    fn test_month_range_and_earnings_exclusion() {
        let entries = vec![
            transaction("15.01.2024", "January expense", -1000),
            transaction("10.02.2024", "February expense", -2000),
            transaction("20.02.2024", "February earning", 500),
        ];
        let filter = month_filter("02.2024", "02.2024");

        let classified = classify(&entries, &[]);
        let filtered = apply(classified, &filter);

        // January is out of range, the earning is not opted in
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].entry.value, Money::from_cents(-2000));
    }

    #[test]
    fn test_earnings_opt_in() {
        let entries = vec![
            transaction("10.02.2024", "expense", -2000),
            transaction("20.02.2024", "earning", 500),
        ];
        let mut filter = EntryFilter::default();
        assert_eq!(apply(classify(&entries, &[]), &filter).len(), 1);

        filter.include_earnings = true;
        assert_eq!(apply(classify(&entries, &[]), &filter).len(), 2);
    }

    #[test]
    fn test_unbounded_filter_keeps_all_expenses() {
        let entries = vec![
            transaction("01.01.1999", "old", -100),
            transaction("31.12.2030", "future", -100),
        ];
        let filtered = apply(classify(&entries, &[]), &EntryFilter::default());
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_end_month_includes_leap_day() {
        let entries = vec![
            transaction("29.02.2024", "leap day expense", -100),
            transaction("01.03.2024", "march expense", -100),
        ];
        let filter = month_filter("02.2024", "02.2024");

        let filtered = apply(classify(&entries, &[]), &filter);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].entry.date, LedgerDate::parse("29.02.2024").unwrap());
    }

    #[test]
    fn test_hidden_categories_suppressed() {
        let entries = vec![
            transaction("10.02.2024", "REWE", -1000),
            transaction("11.02.2024", "Mystery", -500),
        ];
        let mut groceries = Category::new("Groceries", "#fff");
        groceries.id = "c1".into();
        groceries.filter_options = FilterOptions {
            includes_one_of: vec!["rewe".into()],
            includes_all_of: vec![],
        };
        let categories = vec![groceries];

        let mut filter = EntryFilter::default();
        filter.hidden_categories.insert("c1".into());
        let filtered = apply(classify(&entries, &categories), &filter);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].entry.description, "Mystery");

        // The sentinel id suppresses unmatched transactions
        let mut filter = EntryFilter::default();
        filter.hidden_categories.insert(UNCATEGORIZED_ID.into());
        let filtered = apply(classify(&entries, &categories), &filter);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].entry.description, "REWE");
    }
}
