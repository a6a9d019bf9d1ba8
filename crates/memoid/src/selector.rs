// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The cached selector handed out by the cache.

use std::{
    fmt::Debug,
    hash::Hash,
    sync::{Arc, Weak},
};

use crate::{cache::Shared, computation::Instance};

/// A memoized selector instance bound to one entity id.
///
/// Cloning is cheap and every clone refers to the same instance; use
/// [`Selector::ptr_eq`] to check whether two selectors are the same cached
/// instance. Each [`call`](Selector::call) records a use of the entity id with the
/// owning cache, which keeps the entry from being collected, and then delegates
/// to the underlying instance.
///
/// A selector holds only a weak reference to its cache. It keeps working after
/// its entry is evicted or its cache is dropped, but it no longer records uses.
pub struct Selector<K, S, R> {
    inner: Arc<SelectorInner<K, S, R>>,
}

struct SelectorInner<K, S, R> {
    entity_id: K,
    instance: Instance<S, R>,
    owner: Weak<Shared<K>>,
}

impl<K, S, R> Selector<K, S, R>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
{
    pub(crate) fn new(entity_id: K, instance: Instance<S, R>, owner: Weak<Shared<K>>) -> Self {
        Self {
            inner: Arc::new(SelectorInner {
                entity_id,
                instance,
                owner,
            }),
        }
    }

    /// Records a use of the entity id and evaluates the selector against `state`.
    ///
    /// The return value is exactly what the underlying instance returns.
    pub fn call(&self, state: &S) -> R {
        if let Some(owner) = self.inner.owner.upgrade() {
            owner.touch(&self.inner.entity_id);
        }

        (self.inner.instance)(state)
    }
}

impl<K, S, R> Selector<K, S, R> {
    /// Returns the entity id this selector was built for.
    #[must_use]
    pub fn entity_id(&self) -> &K {
        &self.inner.entity_id
    }

    /// Returns `true` when both selectors are the same cached instance.
    #[must_use]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }
}

impl<K, S, R> Clone for Selector<K, S, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: Debug, S, R> Debug for Selector<K, S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector")
            .field("entity_id", &self.inner.entity_id)
            .finish_non_exhaustive()
    }
}
