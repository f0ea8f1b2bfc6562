// Sum accumulator
//
// A map from composite key to running u64 sum. Rows of a batch are grouped
// locally first, then every group sum is added into the running map. Both
// steps use checked arithmetic so a sum that leaves 64 bits is an error,
// never a wrap.

use crate::error::{PipelineError, Result};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Running key → sum map.
///
/// Backed by a `BTreeMap` so iteration order is the key order, which is what
/// makes the written marts deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accumulator<K: Ord> {
    label: &'static str,
    sums: BTreeMap<K, u64>,
}

impl<K: Ord + Hash + Clone> Accumulator<K> {
    /// `label` names the accumulator in overflow errors.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            sums: BTreeMap::new(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Group `rows` by `key_fn`, sum `measure_fn` per group and add every
    /// group sum into the running map.
    ///
    /// Rows for which `key_fn` returns `None` contribute nothing.
    pub fn merge<R, KF, MF>(&mut self, rows: &[R], mut key_fn: KF, mut measure_fn: MF) -> Result<()>
    where
        KF: FnMut(&R) -> Option<K>,
        MF: FnMut(&R) -> u64,
    {
        let mut groups: HashMap<K, u64> = HashMap::new();
        for row in rows {
            let Some(key) = key_fn(row) else {
                continue;
            };
            let measure = measure_fn(row);
            let slot = groups.entry(key).or_insert(0);
            *slot = slot
                .checked_add(measure)
                .ok_or_else(|| PipelineError::overflow(self.label))?;
        }

        for (key, sum) in groups {
            self.add(key, sum)?;
        }
        Ok(())
    }

    /// Add `value` to the running sum for `key`.
    pub fn add(&mut self, key: K, value: u64) -> Result<()> {
        let label = self.label;
        match self.sums.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => {
                let sum = slot
                    .get()
                    .checked_add(value)
                    .ok_or_else(|| PipelineError::overflow(label))?;
                *slot.get_mut() = sum;
            }
        }
        Ok(())
    }

    /// Fold a partial accumulator into this one.
    pub fn combine(&mut self, other: Accumulator<K>) -> Result<()> {
        for (key, sum) in other.sums {
            self.add(key, sum)?;
        }
        Ok(())
    }

    pub fn get(&self, key: &K) -> u64 {
        self.sums.get(key).copied().unwrap_or(0)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.sums.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.sums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> {
        self.sums.iter().map(|(key, sum)| (key, *sum))
    }

    /// Keys in key order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.sums.keys()
    }

    pub fn into_sorted_vec(self) -> Vec<(K, u64)> {
        self.sums.into_iter().collect()
    }
}
