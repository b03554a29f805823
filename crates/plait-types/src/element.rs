//! Versioned records and the positional edit script over them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The smallest versioned record: a caller-defined key path and its payload.
///
/// Sequences of elements are produced by the schema layer, which flattens a
/// plugin's nested state into a stable order. This crate never interprets the
/// key or the value beyond comparing them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffElement {
    pub key: String,
    pub value: Value,
}

impl DiffElement {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Positional edit script turning one ordered sequence into another.
///
/// `remove` is keyed by index in the *before* sequence, `add` by index in the
/// *after* sequence. Both maps iterate in ascending index order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize",
    deserialize = "T: Deserialize<'de>"
))]
pub struct Diff<T> {
    pub add: BTreeMap<usize, T>,
    pub remove: BTreeMap<usize, T>,
}

impl<T> Diff<T> {
    /// An edit script with no changes.
    pub fn new() -> Self {
        Self {
            add: BTreeMap::new(),
            remove: BTreeMap::new(),
        }
    }

    /// Returns `true` if applying this diff is a no-op.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }

    /// Total number of add and remove entries.
    pub fn len(&self) -> usize {
        self.add.len() + self.remove.len()
    }

    pub fn additions(&self) -> usize {
        self.add.len()
    }

    pub fn removals(&self) -> usize {
        self.remove.len()
    }
}

impl<T> Default for Diff<T> {
    fn default() -> Self {
        Self::new()
    }
}
