use std::collections::btree_map;
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Value;

/// An ordered key -> value mapping.
///
/// Used for store snapshots, planner scratch states, action preconditions/effects and goal desired
/// states. Iteration is in lexicographic key order, which is what keeps planning and effect
/// application deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct WorldState {
    values: BTreeMap<String, Value>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Store `value` under `key`. Returns `true` when the key was absent or held a structurally
    /// different value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let value = value.into();
        match self.values.entry(key.into()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
            btree_map::Entry::Occupied(mut slot) => {
                if *slot.get() == value {
                    false
                } else {
                    slot.insert(value);
                    true
                }
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.values.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Whether `key` is present and structurally equal to `value`.
    pub fn holds(&self, key: &str, value: &Value) -> bool {
        self.values.get(key) == Some(value)
    }

    /// Every pair in `required` is present here with an equal value.
    ///
    /// An empty `required` is trivially satisfied.
    pub fn satisfies(&self, required: &WorldState) -> bool {
        required.iter().all(|(key, value)| self.holds(key, value))
    }

    /// At least one pair in `changes` is absent here or differs.
    pub fn would_change(&self, changes: &WorldState) -> bool {
        changes.iter().any(|(key, value)| !self.holds(key, value))
    }

    /// At least one pair appears, with an equal value, in both states.
    pub fn shares_pair_with(&self, other: &WorldState) -> bool {
        self.iter().any(|(key, value)| other.holds(key, value))
    }

    /// Overwrite every key in `changes`.
    pub fn apply(&mut self, changes: &WorldState) {
        for (key, value) in changes.iter() {
            self.values.insert(key.clone(), value.clone());
        }
    }
}

impl<K, V> FromIterator<(K, V)> for WorldState
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut state = WorldState::new();
        for (key, value) in iter {
            state.insert(key, value);
        }
        state
    }
}

impl<'a> IntoIterator for &'a WorldState {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
