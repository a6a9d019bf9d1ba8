// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A computation bound to a cache.

use std::{fmt::Debug, hash::Hash, sync::Arc};

use crate::{Computation, Selector, SelectorCache};

/// Shared selector constructor returned by [`Accessors::into_fns`].
pub type MakeSelectorFn<K, S, R, E> = Arc<dyn Fn(&K) -> Result<Selector<K, S, R>, E> + Send + Sync>;

/// Shared one-shot reader returned by [`Accessors::into_fns`].
pub type ReadFn<K, S, R, E> = Arc<dyn Fn(&S, &K) -> Result<R, E> + Send + Sync>;

/// The pair of operations a caller needs to use one computation through one cache.
///
/// Created by [`SelectorCache::accessors`]. Both operations go through the cache, so
/// the selector returned by [`make_selector`](Self::make_selector) for an entity id
/// is the same instance [`read`](Self::read) evaluates.
///
/// # Examples
///
/// ```
/// use anyspawn::Spawner;
/// use memoid::{Computation, SelectorCache};
/// use tick::Clock;
///
/// # fn main() -> Result<(), memoid::Error> {
/// let cache = SelectorCache::builder::<String>(Clock::new_frozen(), Spawner::new_custom(|_task| {})).build()?;
///
/// let greeting = cache.accessors(Computation::<String, &'static str, String>::new(|name: &String| {
///     let name = name.clone();
///     move |salutation: &&'static str| format!("{salutation}, {name}")
/// }));
///
/// let Ok(text) = greeting.read(&"hello", &"ada".to_string());
/// assert_eq!(text, "hello, ada");
/// # Ok(())
/// # }
/// ```
pub struct Accessors<K, S, R, E> {
    cache: SelectorCache<K>,
    computation: Computation<K, S, R, E>,
}

impl<K, S, R, E> Accessors<K, S, R, E> {
    pub(crate) fn new(cache: SelectorCache<K>, computation: Computation<K, S, R, E>) -> Self {
        Self { cache, computation }
    }

    /// Returns the bound computation.
    #[must_use]
    pub fn computation(&self) -> &Computation<K, S, R, E> {
        &self.computation
    }

    /// Returns the cache selectors are stored in.
    #[must_use]
    pub fn cache(&self) -> &SelectorCache<K> {
        &self.cache
    }
}

impl<K, S, R, E> Accessors<K, S, R, E>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    S: 'static,
    R: 'static,
    E: 'static,
{
    /// Returns the cached selector for `entity_id`.
    ///
    /// # Errors
    ///
    /// Returns the computation's factory error if the selector has to be built and
    /// the build fails.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`SelectorCache::get_or_create`].
    pub fn make_selector(&self, entity_id: &K) -> Result<Selector<K, S, R>, E> {
        self.cache.get_or_create(&self.computation, entity_id)
    }

    /// Evaluates the cached selector for `entity_id` against `state`.
    ///
    /// # Errors
    ///
    /// Returns the computation's factory error if the selector has to be built and
    /// the build fails.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`SelectorCache::get_or_create`].
    pub fn read(&self, state: &S, entity_id: &K) -> Result<R, E> {
        self.make_selector(entity_id).map(|selector| selector.call(state))
    }

    /// Converts the accessors into a pair of shareable closures.
    #[must_use]
    pub fn into_fns(self) -> (MakeSelectorFn<K, S, R, E>, ReadFn<K, S, R, E>) {
        let shared = Arc::new(self);
        let reader = Arc::clone(&shared);

        (
            Arc::new(move |entity_id: &K| shared.make_selector(entity_id)),
            Arc::new(move |state: &S, entity_id: &K| reader.read(state, entity_id)),
        )
    }
}

impl<K, S, R, E> Clone for Accessors<K, S, R, E> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            computation: self.computation.clone(),
        }
    }
}

impl<K, S, R, E> Debug for Accessors<K, S, R, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessors")
            .field("computation", &self.computation.id())
            .finish_non_exhaustive()
    }
}
