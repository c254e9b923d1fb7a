//! Core data models for kassenbuch
//!
//! This module contains the data structures of the ledger domain:
//! transactions, categories, the entry filter, sessions and the value types
//! (money, dates) they are built from.

pub mod category;
pub mod date;
pub mod entry_filter;
pub mod money;
pub mod session;
pub mod transaction;

pub use category::{Category, CategoryStats, FilterOptions, UNCATEGORIZED_ID};
pub use date::{LedgerDate, Month};
pub use entry_filter::EntryFilter;
pub use money::Money;
pub use session::{validate_session_shape, ApplicationState, Session};
pub use transaction::Transaction;
