//! Combining independently computed snapshots.
//!
//! Every snapshot type implements [`Merge`]. Inputs are never mutated, so
//! shards produced on different threads or machines can be merged in any
//! grouping; fields that cannot be recombined exactly carry a [`Provenance`].

use crate::error::{PaceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Whether a merged value equals what a single unsharded pass would produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    #[default]
    Exact,
    Approximate,
}

impl Provenance {
    pub fn is_exact(self) -> bool {
        self == Provenance::Exact
    }
}

pub trait Merge: Clone {
    /// Fold `other` into `self` using each field's combination rule.
    fn absorb(&mut self, other: &Self);

    /// Recompute derived fields (rates, averages, peaks) from the merged state.
    fn refresh(&mut self) {}
}

/// Merge a non-empty ordered list of snapshots into one.
pub fn merge_snapshots<T: Merge>(parts: &[T]) -> Result<T> {
    let (first, rest) = parts.split_first().ok_or_else(|| {
        PaceError::InvalidInput("cannot merge an empty list of snapshots".to_string())
    })?;

    let mut merged = first.clone();
    for part in rest {
        merged.absorb(part);
    }
    merged.refresh();
    debug!(parts = parts.len(), "Merged snapshots");
    Ok(merged)
}

/// Absorb entries present in both maps and copy the rest unchanged.
pub fn absorb_map<K, V>(into: &mut BTreeMap<K, V>, other: &BTreeMap<K, V>)
where
    K: Ord + Clone,
    V: Merge,
{
    for (key, value) in other {
        match into.get_mut(key) {
            Some(existing) => existing.absorb(value),
            None => {
                into.insert(key.clone(), value.clone());
            }
        }
    }
}
