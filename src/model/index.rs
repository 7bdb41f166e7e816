//! Exact-value attribute indexes
//!
//! Indexes use BTreeMap<String, ObjectSet> for deterministic ordering.
//! Keys are the lower-cased rendered value, so a lookup returns exactly the
//! objects a case-insensitive equality test would accept. Object sets are
//! always ordered by ascending object id.

use std::collections::btree_set;
use std::collections::{BTreeMap, BTreeSet};

use super::object::ObjectId;

/// Ordered set of objects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectSet {
    ids: BTreeSet<ObjectId>,
}

impl ObjectSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an object, returning false if it was already present
    pub fn insert(&mut self, id: ObjectId) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterates in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.ids.iter().copied()
    }

    /// Returns the ids as a vector, ascending
    pub fn to_vec(&self) -> Vec<ObjectId> {
        self.iter().collect()
    }
}

impl FromIterator<ObjectId> for ObjectSet {
    fn from_iter<T: IntoIterator<Item = ObjectId>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ObjectSet {
    type Item = &'a ObjectId;
    type IntoIter = btree_set::Iter<'a, ObjectId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

/// Folds a rendered value into its index key
pub fn index_key(value: &str) -> String {
    value.to_lowercase()
}

/// Exact-value index for one attribute
#[derive(Debug, Clone, Default)]
pub struct AttributeIndex {
    tree: BTreeMap<String, ObjectSet>,
}

impl AttributeIndex {
    /// Creates a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `id` holds `value`
    pub fn insert(&mut self, value: &str, id: ObjectId) {
        self.tree.entry(index_key(value)).or_default().insert(id);
    }

    /// Looks up every object holding `value` (case-insensitive)
    pub fn lookup(&self, value: &str) -> Option<&ObjectSet> {
        self.tree.get(&index_key(value))
    }

    /// Returns the number of objects holding `value`
    pub fn cardinality(&self, value: &str) -> usize {
        self.lookup(value).map_or(0, ObjectSet::len)
    }

    /// Returns the number of distinct keys
    pub fn key_count(&self) -> usize {
        self.tree.len()
    }

    /// Returns the total number of (key, object) entries
    pub fn entry_count(&self) -> usize {
        self.tree.values().map(ObjectSet::len).sum()
    }
}
