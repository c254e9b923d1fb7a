//! Category statistics aggregation
//!
//! Computes display statistics per category, plus the synthetic
//! "uncategorized" bucket, over a classified and already-filtered
//! transaction set. Pure function over its inputs: stats are rebuilt from
//! scratch on every call and never carry state between runs.

use std::collections::BTreeSet;

use crate::models::{Category, CategoryStats, Money, UNCATEGORIZED_ID};

use super::classify::Classified;

/// Display color of the uncategorized bucket
const UNCATEGORIZED_COLOR: &str = "var(--grey-10)";

/// Compute per-category statistics, ordered ascending by total balance
///
/// The ordering surfaces the biggest expense categories first. Averages are
/// 0 for an empty input set, and `percent_of_total` is 0 when the overall
/// sum is zero; neither ever goes NaN or infinite.
pub fn aggregate(classified: &[Classified<'_>], categories: &[Category]) -> Vec<CategoryStats> {
    let amount_of_months = classified
        .iter()
        .map(|c| c.entry.date.month())
        .collect::<BTreeSet<_>>()
        .len();
    let sum_of_all_entries: Money = classified.iter().map(|c| c.entry.value).sum();

    let mut stats: Vec<CategoryStats> = categories
        .iter()
        // A stale persisted leftover carrying the sentinel id is never
        // treated as a real category; the bucket is rebuilt below.
        .filter(|category| category.id != UNCATEGORIZED_ID)
        .map(|category| {
            let in_category: Vec<&Classified<'_>> = classified
                .iter()
                .filter(|c| c.category_id() == Some(category.id.as_str()))
                .collect();
            build_stats(
                category.id.clone(),
                category.name.clone(),
                category.color.clone(),
                category.is_excluded,
                &in_category,
                amount_of_months,
                sum_of_all_entries,
            )
        })
        .collect();

    let unclassified: Vec<&Classified<'_>> = classified
        .iter()
        .filter(|c| c.category.is_none())
        .collect();
    if !unclassified.is_empty() {
        stats.push(build_stats(
            UNCATEGORIZED_ID.to_string(),
            "Uncategorized".to_string(),
            UNCATEGORIZED_COLOR.to_string(),
            false,
            &unclassified,
            amount_of_months,
            sum_of_all_entries,
        ));
    }

    // Most negative first, so the biggest expense buckets lead any list
    stats.sort_by_key(|s| s.total_balance);
    stats
}

fn build_stats(
    id: String,
    name: String,
    color: String,
    is_excluded: bool,
    entries: &[&Classified<'_>],
    amount_of_months: usize,
    sum_of_all_entries: Money,
) -> CategoryStats {
    let total_balance: Money = entries.iter().map(|c| c.entry.value).sum();
    let amount_of_entries = entries.len();

    let average_balance_per_month = if amount_of_months == 0 {
        Money::zero()
    } else {
        Money::from_units(total_balance.as_units() / amount_of_months as f64)
    };
    let average_amount_per_month = if amount_of_months == 0 {
        0.0
    } else {
        amount_of_entries as f64 / amount_of_months as f64
    };
    let percent_of_total = if sum_of_all_entries.is_zero() {
        0.0
    } else {
        total_balance.as_units() / sum_of_all_entries.as_units()
    };

    CategoryStats {
        id,
        name,
        color,
        is_excluded,
        total_balance,
        total_balance_formatted: total_balance.format_eur(),
        average_balance_per_month: average_balance_per_month.format_eur(),
        amount_of_entries,
        average_amount_per_month,
        percent_of_total,
    }
}
