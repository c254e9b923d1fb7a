//! Per-key debounced notification scheduling
//!
//! A write to the store never calls subscribers inline. It only marks every
//! callback subscribed to the written key as pending; the pending set is
//! drained by [`KeyedStore::flush`](super::KeyedStore::flush), the Rust
//! rendition of "the next turn of the event loop". A callback that is marked
//! pending again before the drain is superseded, not queued, so a burst of
//! writes within one logical operation collapses into a single invocation.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::error::LedgerResult;

use super::KeyedStore;

/// Wildcard key matching every change
pub const ALL_KEYS: &str = "*";

/// Handle identifying one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

pub(super) type Callback = Rc<RefCell<dyn FnMut(&KeyedStore) -> LedgerResult<()>>>;

struct Subscription {
    id: SubscriberId,
    keys: HashSet<String>,
    callback: Callback,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    subscriptions: Vec<Subscription>,
    /// Pending callback ids in scheduling order; re-scheduling moves an id to
    /// the back (the last change within a window is the one that counts).
    pending: Vec<SubscriberId>,
}

/// Coalesces bursts of writes into one notification per distinct callback
#[derive(Default)]
pub struct ChangeNotifier {
    inner: RefCell<Inner>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn subscribe(&self, keys: HashSet<String>, callback: Callback) -> SubscriberId {
        let mut inner = self.inner.borrow_mut();
        let id = SubscriberId(inner.next_id);
        inner.next_id += 1;
        inner.subscriptions.push(Subscription { id, keys, callback });
        id
    }

    /// Drop a subscription; a pending notification for it is dropped as well
    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut inner = self.inner.borrow_mut();
        inner.subscriptions.retain(|s| s.id != id);
        inner.pending.retain(|p| *p != id);
    }

    /// Mark every callback subscribed to `key` (or to "*") as pending
    pub fn schedule(&self, key: &str) {
        let mut inner = self.inner.borrow_mut();
        let ids: Vec<SubscriberId> = inner
            .subscriptions
            .iter()
            .filter(|s| s.keys.contains(key) || s.keys.contains(ALL_KEYS))
            .map(|s| s.id)
            .collect();
        for id in ids {
            inner.pending.retain(|p| *p != id);
            inner.pending.push(id);
        }
    }

    /// True when at least one notification is waiting for delivery
    pub fn has_pending(&self) -> bool {
        !self.inner.borrow().pending.is_empty()
    }

    /// Snapshot and clear the pending set, resolving ids to callbacks
    ///
    /// Releases all internal borrows before returning so the callbacks are
    /// free to subscribe, schedule or write while they run.
    pub(super) fn take_pending(&self) -> Vec<(SubscriberId, Callback)> {
        let mut inner = self.inner.borrow_mut();
        let pending = std::mem::take(&mut inner.pending);
        pending
            .into_iter()
            .filter_map(|id| {
                inner
                    .subscriptions
                    .iter()
                    .find(|s| s.id == id)
                    .map(|s| (id, Rc::clone(&s.callback)))
            })
            .collect()
    }

    pub(super) fn lookup(&self, id: SubscriberId) -> Option<Callback> {
        self.inner
            .borrow()
            .subscriptions
            .iter()
            .find(|s| s.id == id)
            .map(|s| Rc::clone(&s.callback))
    }
}
