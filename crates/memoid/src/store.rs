// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Memo store and recency table.
//!
//! Both maps live in one [`MemoStore`] so that every mutation keeps their key sets
//! in lock-step: an entity id is evicted from both maps in the same call, and the
//! recency table never gains an id the memo store does not hold.

use std::{
    hash::Hash,
    time::{Duration, Instant},
};

use hashbrown::HashMap;

use crate::ComputationId;

#[derive(Debug)]
pub(crate) struct MemoStore<K, V> {
    entries: HashMap<K, HashMap<ComputationId, V>>,
    recency: HashMap<K, Instant>,
}

impl<K, V> MemoStore<K, V>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
            recency: HashMap::new(),
        }
    }

    pub(crate) fn get(&self, id: &K, computation: ComputationId) -> Option<&V> {
        self.entries.get(id)?.get(&computation)
    }

    /// Stores `value` unless an entry for the pair already exists, returning whichever
    /// value ends up in the store.
    ///
    /// `seed` is written to the recency table only when this is the first entry for `id`.
    pub(crate) fn insert(&mut self, id: &K, computation: ComputationId, value: V, seed: Option<Instant>) -> &V {
        if let Some(at) = seed
            && !self.entries.contains_key(id)
        {
            self.recency.insert(id.clone(), at);
        }

        self.entries
            .entry(id.clone())
            .or_default()
            .entry(computation)
            .or_insert(value)
    }

    /// Records a use of `id`. Ids that are not in the store are ignored.
    pub(crate) fn touch(&mut self, id: &K, now: Instant) -> bool {
        if !self.entries.contains_key(id) {
            return false;
        }

        match self.recency.get_mut(id) {
            Some(last_used) => *last_used = now,
            None => {
                self.recency.insert(id.clone(), now);
            }
        }

        true
    }

    /// Evicts every id whose last use is more than `stale_after` before `now`.
    pub(crate) fn sweep(&mut self, now: Instant, stale_after: Duration) -> usize {
        let entries = &mut self.entries;
        let mut evicted = 0;

        self.recency.retain(|id, last_used| {
            if now.saturating_duration_since(*last_used) > stale_after {
                // Missing entries are fine, the id may already be gone.
                entries.remove(id);
                evicted += 1;
                false
            } else {
                true
            }
        });

        evicted
    }

    pub(crate) fn remove(&mut self, id: &K) -> bool {
        self.recency.remove(id);
        self.entries.remove(id).is_some()
    }

    pub(crate) fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.recency.clear();
        removed
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn contains(&self, id: &K) -> bool {
        self.entries.contains_key(id)
    }

    pub(crate) fn selector_count(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub(crate) fn last_used(&self, id: &K) -> Option<Instant> {
        self.recency.get(id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Computation;

    fn computation_id() -> ComputationId {
        Computation::<u32, (), ()>::new(|_: &u32| |(): &()| ()).id()
    }

    #[test]
    fn insert_then_get_returns_value() {
        let mut store = MemoStore::<&str, u32>::new();
        let c = computation_id();

        assert_eq!(*store.insert(&"a", c, 1, None), 1);
        assert_eq!(store.get(&"a", c), Some(&1));
        assert_eq!(store.get(&"b", c), None);
    }

    #[test]
    fn insert_keeps_existing_value() {
        let mut store = MemoStore::<&str, u32>::new();
        let c = computation_id();

        store.insert(&"a", c, 1, None);
        assert_eq!(*store.insert(&"a", c, 2, None), 1);
        assert_eq!(store.selector_count(), 1);
    }

    #[test]
    fn computations_coexist_under_one_id() {
        let mut store = MemoStore::<&str, u32>::new();
        let c1 = computation_id();
        let c2 = computation_id();

        store.insert(&"a", c1, 1, None);
        store.insert(&"a", c2, 2, None);

        assert_eq!(store.len(), 1);
        assert_eq!(store.selector_count(), 2);
        assert_eq!(store.get(&"a", c1), Some(&1));
        assert_eq!(store.get(&"a", c2), Some(&2));
    }

    #[test]
    fn seed_applies_only_to_first_entry() {
        let mut store = MemoStore::<&str, u32>::new();
        let start = Instant::now();
        let later = start + Duration::from_secs(5);

        store.insert(&"a", computation_id(), 1, Some(start));
        store.insert(&"a", computation_id(), 2, Some(later));

        assert_eq!(store.last_used(&"a"), Some(start));
    }

    #[test]
    fn no_seed_leaves_recency_empty() {
        let mut store = MemoStore::<&str, u32>::new();
        store.insert(&"a", computation_id(), 1, None);

        assert!(store.contains(&"a"));
        assert_eq!(store.last_used(&"a"), None);
    }

    #[test]
    fn touch_ignores_absent_ids() {
        let mut store = MemoStore::<&str, u32>::new();

        assert!(!store.touch(&"ghost", Instant::now()));
        assert_eq!(store.last_used(&"ghost"), None);
    }

    #[test]
    fn touch_overwrites_last_use() {
        let mut store = MemoStore::<&str, u32>::new();
        let start = Instant::now();
        let later = start + Duration::from_secs(30);

        store.insert(&"a", computation_id(), 1, Some(start));
        assert!(store.touch(&"a", later));
        assert_eq!(store.last_used(&"a"), Some(later));
    }

    #[test]
    fn sweep_evicts_strictly_older_than_threshold() {
        let mut store = MemoStore::<&str, u32>::new();
        let start = Instant::now();
        let threshold = Duration::from_secs(60);

        store.insert(&"old", computation_id(), 1, Some(start));
        store.insert(&"edge", computation_id(), 2, Some(start + Duration::from_secs(1)));

        let now = start + Duration::from_secs(61);
        assert_eq!(store.sweep(now, threshold), 1);

        assert!(!store.contains(&"old"));
        assert_eq!(store.last_used(&"old"), None);
        assert!(store.contains(&"edge"));
    }

    #[test]
    fn sweep_skips_ids_without_recency() {
        let mut store = MemoStore::<&str, u32>::new();
        store.insert(&"never-used", computation_id(), 1, None);

        let far_future = Instant::now() + Duration::from_secs(3600);
        assert_eq!(store.sweep(far_future, Duration::ZERO), 0);
        assert!(store.contains(&"never-used"));
    }

    #[test]
    fn remove_and_clear_drop_both_maps() {
        let mut store = MemoStore::<&str, u32>::new();
        let now = Instant::now();

        store.insert(&"a", computation_id(), 1, Some(now));
        store.insert(&"b", computation_id(), 2, Some(now));

        assert!(store.remove(&"a"));
        assert!(!store.remove(&"a"));
        assert_eq!(store.last_used(&"a"), None);

        assert_eq!(store.clear(), 1);
        assert!(store.is_empty());
        assert_eq!(store.last_used(&"b"), None);
    }
}
