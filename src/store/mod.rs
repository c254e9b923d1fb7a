//! Reactive persisted key-value store
//!
//! Holds named, typed values in durable local storage and notifies
//! subscribers on change. Writes are synchronous and immediately visible to
//! a subsequent `get`; notification delivery is deferred and debounced (see
//! [`notifier`]). The store is a single-threaded shared resource: writing
//! several dependent keys is not atomic, and subscribers must tolerate
//! transiently inconsistent intermediate states between them.

pub mod backend;
pub mod notifier;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use notifier::{ChangeNotifier, SubscriberId, ALL_KEYS};

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::config::LedgerPaths;
use crate::error::{LedgerError, LedgerResult};

/// Well-known store keys
pub mod keys {
    /// The transaction list of the active session
    pub const ENTRIES: &str = "entries";
    /// The category list of the active session
    pub const CATEGORIES: &str = "categories";
    /// The persisted entry filter of the active session
    pub const ENTRY_FILTER: &str = "entryFilter";
    /// All known sessions
    pub const SESSIONS: &str = "sessions";
    /// Application state (active session id)
    pub const STATE: &str = "state";
}

/// Upper bound on delivery turns in [`KeyedStore::settle`]. Subscribers that
/// keep writing each other's keys past this point are cyclic.
const MAX_SETTLE_TURNS: usize = 64;

/// Named, typed values in durable local storage with change subscription
pub struct KeyedStore {
    backend: RefCell<Box<dyn StorageBackend>>,
    notifier: ChangeNotifier,
}

impl KeyedStore {
    /// Create a store over an arbitrary backend
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            backend: RefCell::new(backend),
            notifier: ChangeNotifier::new(),
        }
    }

    /// Create a store persisted under the data directory of `paths`
    pub fn open(paths: &LedgerPaths) -> LedgerResult<Self> {
        Ok(Self::new(Box::new(FileBackend::new(paths)?)))
    }

    /// Create a throwaway in-memory store
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    /// Get the current value for `key`
    ///
    /// Absent and corrupt stored data both yield `None`; a deserialization
    /// failure is logged, never returned as an error.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.backend.borrow().read(key) {
            Ok(bytes) => bytes?,
            Err(err) => {
                error!(key, %err, "Failed to read stored value");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                error!(key, %err, "Failed to parse stored value");
                None
            }
        }
    }

    /// Serialize and persist `value`, then schedule a notification for `key`
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> LedgerResult<()> {
        let bytes = serde_json::to_vec(value)?;
        self.backend.borrow_mut().write(key, &bytes)?;
        self.notifier.schedule(key);
        Ok(())
    }

    /// Partially update a record-shaped value, setting one field
    ///
    /// An absent value starts as an empty record. A stored sequence cannot be
    /// partially updated by field name; attempting it is a programmer error
    /// and fails with [`LedgerError::Invariant`].
    pub fn update(&self, key: &str, field: &str, value: Value) -> LedgerResult<()> {
        let current: Option<Value> = self.get(key);
        let mut record = match current {
            Some(Value::Object(map)) => map,
            None => serde_json::Map::new(),
            Some(other) => {
                return Err(LedgerError::Invariant(format!(
                    "Partial update of non-record value \"{}\" ({})",
                    key,
                    json_kind(&other)
                )));
            }
        };
        record.insert(field.to_string(), value);
        self.set(key, &Value::Object(record))
    }

    /// Clear one or more keys and schedule their notifications
    pub fn remove(&self, keys: &[&str]) -> LedgerResult<()> {
        for key in keys {
            self.backend.borrow_mut().delete(key)?;
            self.notifier.schedule(key);
        }
        Ok(())
    }

    /// Register `callback` against every key in the comma-separated list
    ///
    /// "*" subscribes to all keys. The callback is invoked once immediately,
    /// so computed state is never stale at registration time, and then once
    /// per delivery turn in which any of its keys changed. A callback error
    /// is logged and never propagated to the writer.
    pub fn subscribe<F>(&self, keys: &str, callback: F) -> SubscriberId
    where
        F: FnMut(&KeyedStore) -> LedgerResult<()> + 'static,
    {
        let keys: HashSet<String> = keys
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        let id = self.notifier.subscribe(keys, Rc::new(RefCell::new(callback)));
        if let Some(callback) = self.notifier.lookup(id) {
            self.invoke(id, &callback);
        }
        id
    }

    /// Drop a subscription
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.notifier.unsubscribe(id);
    }

    /// True when notifications are waiting for delivery
    pub fn has_pending(&self) -> bool {
        self.notifier.has_pending()
    }

    /// Deliver one turn of pending notifications
    ///
    /// Each pending callback is invoked exactly once, regardless of how many
    /// of its keys changed since the last turn. Writes performed inside a
    /// callback become pending for the next turn. Returns the number of
    /// callbacks invoked.
    pub fn flush(&self) -> usize {
        let pending = self.notifier.take_pending();
        let count = pending.len();
        for (id, callback) in pending {
            self.invoke(id, &callback);
        }
        count
    }

    /// Deliver turns until no notifications remain
    pub fn settle(&self) {
        for _ in 0..MAX_SETTLE_TURNS {
            if self.flush() == 0 {
                return;
            }
        }
        warn!(
            turns = MAX_SETTLE_TURNS,
            "Store notifications did not settle; subscribers are cyclic"
        );
    }

    fn invoke(&self, id: SubscriberId, callback: &notifier::Callback) {
        if let Err(err) = (callback.borrow_mut())(self) {
            error!(subscriber = ?id, %err, "Subscriber callback failed");
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn test_set_get_round_trip() {
        let store = KeyedStore::in_memory();
        assert_eq!(store.get::<Vec<i64>>(keys::ENTRIES), None);

        store.set(keys::ENTRIES, &vec![1i64, 2, 3]).unwrap();
        // Writes are synchronous and immediately visible
        assert_eq!(store.get::<Vec<i64>>(keys::ENTRIES), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_corrupt_value_reads_as_absent() {
        let mut backend = MemoryBackend::new();
        backend.write(keys::STATE, b"{not json").unwrap();
        let store = KeyedStore::new(Box::new(backend));

        assert_eq!(store.get::<Value>(keys::STATE), None);
    }

    #[test]
    fn test_update_record() {
        let store = KeyedStore::in_memory();
        store
            .set(keys::STATE, &json!({"sessionId": "a", "other": 1}))
            .unwrap();
        store.update(keys::STATE, "sessionId", json!("b")).unwrap();

        let state: Value = store.get(keys::STATE).unwrap();
        assert_eq!(state["sessionId"], "b");
        assert_eq!(state["other"], 1);
    }

    #[test]
    fn test_update_absent_starts_empty_record() {
        let store = KeyedStore::in_memory();
        store.update(keys::STATE, "sessionId", json!("a")).unwrap();
        let state: Value = store.get(keys::STATE).unwrap();
        assert_eq!(state, json!({"sessionId": "a"}));
    }

    #[test]
    fn test_update_rejects_sequence_value() {
        let store = KeyedStore::in_memory();
        store.set(keys::ENTRIES, &json!([1, 2, 3])).unwrap();

        let err = store
            .update(keys::ENTRIES, "anything", json!(1))
            .unwrap_err();
        assert!(err.is_fatal());
        // The stored value is untouched
        assert_eq!(store.get::<Value>(keys::ENTRIES), Some(json!([1, 2, 3])));
    }

    #[test]
    fn test_subscribe_invokes_immediately() {
        let store = KeyedStore::in_memory();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);

        store.subscribe(keys::ENTRIES, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_debounce_collapses_write_burst() {
        let store = KeyedStore::in_memory();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);

        store.subscribe("entries, categories", move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });
        assert_eq!(calls.get(), 1); // immediate invocation

        // Three writes to one key, a fourth to another key the same
        // subscriber watches: exactly one further invocation.
        store.set(keys::ENTRIES, &json!([1])).unwrap();
        store.set(keys::ENTRIES, &json!([1, 2])).unwrap();
        store.set(keys::ENTRIES, &json!([1, 2, 3])).unwrap();
        store.set(keys::CATEGORIES, &json!([])).unwrap();
        assert_eq!(calls.get(), 1); // nothing delivered inline

        assert_eq!(store.flush(), 1);
        assert_eq!(calls.get(), 2);

        // No stale notifications are left behind
        assert_eq!(store.flush(), 0);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_writes_to_unrelated_keys_are_not_dropped() {
        let store = KeyedStore::in_memory();
        let a_calls = Rc::new(Cell::new(0));
        let b_calls = Rc::new(Cell::new(0));

        let a = Rc::clone(&a_calls);
        store.subscribe(keys::ENTRIES, move |_| {
            a.set(a.get() + 1);
            Ok(())
        });
        let b = Rc::clone(&b_calls);
        store.subscribe(keys::STATE, move |_| {
            b.set(b.get() + 1);
            Ok(())
        });

        store.set(keys::ENTRIES, &json!([])).unwrap();
        store.set(keys::STATE, &json!({})).unwrap();
        store.flush();

        assert_eq!(a_calls.get(), 2);
        assert_eq!(b_calls.get(), 2);
    }

    #[test]
    fn test_wildcard_subscription() {
        let store = KeyedStore::in_memory();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);

        store.subscribe(ALL_KEYS, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        store.set(keys::SESSIONS, &json!([])).unwrap();
        store.flush();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_callback_error_does_not_stop_others() {
        let store = KeyedStore::in_memory();
        let calls = Rc::new(Cell::new(0));

        store.subscribe(keys::ENTRIES, |_| {
            Err(LedgerError::Validation("boom".into()))
        });
        let counter = Rc::clone(&calls);
        store.subscribe(keys::ENTRIES, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        store.set(keys::ENTRIES, &json!([])).unwrap();
        store.flush();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_remove_clears_and_notifies() {
        let store = KeyedStore::in_memory();
        store.set(keys::ENTRIES, &json!([1])).unwrap();
        store.set(keys::STATE, &json!({})).unwrap();
        store.flush();

        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        store.subscribe("entries,state", move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        store.remove(&[keys::ENTRIES, keys::STATE]).unwrap();
        assert_eq!(store.get::<Value>(keys::ENTRIES), None);
        assert_eq!(store.get::<Value>(keys::STATE), None);

        store.flush();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_unsubscribe_drops_pending() {
        let store = KeyedStore::in_memory();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let id = store.subscribe(keys::ENTRIES, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        store.set(keys::ENTRIES, &json!([])).unwrap();
        store.unsubscribe(id);
        store.flush();
        assert_eq!(calls.get(), 1); // only the immediate invocation
    }

    #[test]
    fn test_settle_delivers_chained_writes() {
        let store = KeyedStore::in_memory();
        let state_calls = Rc::new(Cell::new(0));

        // Writing inside a callback schedules a follow-up turn. The write
        // happens on the first delivered notification, not the immediate
        // invocation at registration time.
        let invocations = Cell::new(0);
        store.subscribe(keys::ENTRIES, move |store| {
            invocations.set(invocations.get() + 1);
            if invocations.get() == 2 {
                store.set(keys::STATE, &json!({"touched": true}))?;
            }
            Ok(())
        });
        let counter = Rc::clone(&state_calls);
        store.subscribe(keys::STATE, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        store.set(keys::ENTRIES, &json!([])).unwrap();
        store.settle();

        assert_eq!(state_calls.get(), 2);
        assert!(!store.has_pending());
    }
}
