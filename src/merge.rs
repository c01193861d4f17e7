//! Nested map merging shared by the Part Store and the Binary Assembler
//!
//! Both `Part.segments` and `Binary.parts` are sparse maps that grow as more
//! articles arrive. Merging a newer copy into an existing one keeps every key
//! the existing copy has, adds the keys only the newer copy has, and lets each
//! value decide how its own fields combine.

use std::collections::{BTreeMap, BTreeSet};

/// A value that can absorb a newer copy of itself
pub trait Merge {
    /// Fold `newer` into `self`
    fn merge(&mut self, newer: Self);
}

impl<K: Ord, V: Merge> Merge for BTreeMap<K, V> {
    fn merge(&mut self, newer: Self) {
        use std::collections::btree_map::Entry;

        for (key, value) in newer {
            match self.entry(key) {
                Entry::Occupied(mut existing) => existing.get_mut().merge(value),
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
            }
        }
    }
}

impl<T: Ord> Merge for BTreeSet<T> {
    fn merge(&mut self, newer: Self) {
        self.extend(newer);
    }
}
