//! Custom error types for kassenbuch
//!
//! This module defines the error hierarchy for the ledger core using thiserror
//! for ergonomic error definitions.
//!
//! Two kinds of failures live here. Recoverable ones (`Validation`, `Import`,
//! `NotFound`, `DateFormat`) surface to the caller as dismissible conditions.
//! `Invariant` and `Missing` mark programmer errors: the operation that hit
//! them must stop instead of corrupting state.

use thiserror::Error;

/// The main error type for ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Storage backend errors (file I/O)
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for data models
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// CSV import errors
    #[error("Import error: {0}")]
    Import(String),

    /// Malformed date string
    #[error("Invalid date format: {0}. Expected format is \"DD.MM.YYYY\"")]
    DateFormat(String),

    /// Malformed month string
    #[error("Invalid month format: {0}. Expected format is \"MM.YYYY\"")]
    MonthFormat(String),

    /// Rule expression could not be parsed or evaluated
    #[error("Rule error: {0}")]
    Rule(String),

    /// Invariant violation, a programming error rather than bad input
    #[error("Invariant violation: {0}")]
    Invariant(String),

    /// A value that must be present is absent
    #[error("Missing required value: {0}")]
    Missing(&'static str),
}

impl LedgerError {
    /// Create a "not found" error for categories
    pub fn category_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Category",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for sessions
    pub fn session_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Session",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this marks a programmer error (invariant or missing value)
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Invariant(_) | Self::Missing(_))
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
