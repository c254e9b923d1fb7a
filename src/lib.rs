//! Kassenbuch - Personal finance ledger core
//!
//! This library provides the core functionality for the Kassenbuch personal
//! finance application. It imports bank account CSV exports, classifies the
//! transactions into user-defined categories via a small rule language, and
//! aggregates per-category statistics over a filterable time range. All data
//! is kept in named sessions persisted as JSON files.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Path management for the data directory
//! - `error`: Custom error types
//! - `models`: Core data models (transactions, categories, sessions, etc.)
//! - `store`: Reactive keyed JSON storage with change notification
//! - `engine`: Classification, filtering, and aggregation
//! - `services`: Business logic layer
//!
//! # Example
//!
//! ```rust,ignore
//! use kassenbuch::config::LedgerPaths;
//! use kassenbuch::services::{CategoryService, SessionService};
//! use kassenbuch::store::KeyedStore;
//!
//! let paths = LedgerPaths::new()?;
//! let store = KeyedStore::open(&paths)?;
//! SessionService::new(&store).ensure_session()?;
//! let stats = CategoryService::new(&store).stats();
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use error::{LedgerError, LedgerResult};
