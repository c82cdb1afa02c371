use core::cell::{Cell, RefCell};
use core::fmt;
use std::rc::Rc;

use crate::{Value, WorldState};

/// Identifies a store subscription; returned by [`WorldStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

type Subscriber = Rc<dyn Fn(&str, &Value)>;

#[derive(Default)]
struct StoreInner {
    values: RefCell<WorldState>,
    subscribers: RefCell<Vec<(SubscriptionId, Subscriber)>>,
    next_id: Cell<u64>,
}

/// The shared, live world state with synchronous change notification.
///
/// `WorldStore` is a cheap handle: clones share the same underlying state. One store is created per
/// simulation and handed to every agent.
///
/// # Notification
///
/// [`set`](Self::set) notifies subscribers only when the key was absent or held a structurally
/// different value. Delivery is synchronous: every callback runs, in subscription order, before
/// `set` returns. The subscriber list is snapshotted at the start of each pass, so a callback may
/// unsubscribe itself (or anyone else) without disturbing the pass; a subscriber removed mid-pass
/// still receives the in-flight notification, and one added mid-pass does not.
///
/// # Re-entrancy
///
/// Notifications cascade. A callback that calls `set` starts a nested pass on the caller's stack,
/// which completes before the outer pass moves on to the next subscriber. The store does not queue
/// or serialize these writes; a callback that unconditionally writes a key it is notified about
/// will recurse until the values converge (or the stack overflows).
#[derive(Clone, Default)]
pub struct WorldStore {
    inner: Rc<StoreInner>,
}

impl WorldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `seed`. No notifications are sent (there are no
    /// subscribers yet).
    pub fn with_seed(seed: WorldState) -> Self {
        let store = Self::new();
        *store.inner.values.borrow_mut() = seed;
        store
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.values.borrow().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.values.borrow().contains(key)
    }

    /// Whether `key` currently holds `Bool(true)`.
    pub fn is_true(&self, key: &str) -> bool {
        self.inner
            .values
            .borrow()
            .get(key)
            .is_some_and(Value::is_true)
    }

    /// Write `value` under `key`, notifying subscribers if it changed.
    ///
    /// Returns whether a notification pass ran.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into();

        let changed = self
            .inner
            .values
            .borrow_mut()
            .insert(key.clone(), value.clone());
        if !changed {
            return false;
        }

        let subscribers: Vec<Subscriber> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(_, subscriber)| Rc::clone(subscriber))
            .collect();

        tracing::trace!(key = %key, value = %value, subscribers = subscribers.len(), "world state changed");
        for subscriber in subscribers {
            subscriber(&key, &value);
        }
        true
    }

    /// Register `callback`; it receives `(key, new_value)` for every change.
    pub fn subscribe(&self, callback: impl Fn(&str, &Value) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.get());
        self.inner.next_id.set(id.0.wrapping_add(1));
        self.inner
            .subscribers
            .borrow_mut()
            .push((id, Rc::new(callback)));
        id
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// A detached copy of the current state.
    pub fn snapshot(&self) -> WorldState {
        self.inner.values.borrow().clone()
    }

    /// Whether two handles refer to the same store.
    pub fn same_store(&self, other: &WorldStore) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for WorldStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldStore")
            .field("values", &*self.inner.values.borrow())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
