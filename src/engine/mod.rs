//! Classification and aggregation engine
//!
//! The pipeline runs in three pure stages whenever underlying data changes:
//! [`classify`](classify::classify) labels each transaction with its first
//! matching category, [`pipeline::apply`] narrows the set to what the entry
//! filter allows, and [`aggregate`](aggregate::aggregate) turns the result
//! into per-category statistics for presentation.

pub mod aggregate;
pub mod classify;
pub mod pipeline;
pub mod rule;

pub use aggregate::aggregate;
pub use classify::{classify, find_category_for, Classified};
pub use rule::RuleError;
