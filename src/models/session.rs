//! Session model
//!
//! A session is a named, self-contained bundle of transactions, categories
//! and the entry filter. Exactly one session is active at a time; the active
//! id lives in the persisted [`ApplicationState`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::category::Category;
use super::entry_filter::EntryFilter;
use super::transaction::Transaction;

/// A named, switchable bundle of ledger data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub entries: Vec<Transaction>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub entry_filter: EntryFilter,
}

impl Session {
    /// Create a new empty session with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            entries: Vec::new(),
            categories: Vec::new(),
            entry_filter: EntryFilter::default(),
        }
    }
}

/// Shape guard for session bundles coming from a file upload
///
/// Must pass before a bundle is deserialized and accepted: non-empty string
/// id and name, array-typed entries and categories.
pub fn validate_session_shape(candidate: &Value) -> bool {
    let non_empty_string = |v: &Value| v.as_str().is_some_and(|s| !s.is_empty());
    non_empty_string(&candidate["id"])
        && non_empty_string(&candidate["name"])
        && candidate["entries"].is_array()
        && candidate["categories"].is_array()
}

/// Persisted application state, stored under the "state" key
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationState {
    /// Id of the active session, if any
    #[serde(default)]
    pub session_id: Option<String>,
}
