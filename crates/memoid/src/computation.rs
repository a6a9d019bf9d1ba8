// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Computation identities and the factories behind them.

use std::{
    convert::Infallible,
    fmt::Debug,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

/// A concrete selector instance built by a computation for one entity id.
pub(crate) type Instance<S, R> = Arc<dyn Fn(&S) -> R + Send + Sync>;

type Factory<K, S, R, E> = dyn Fn(&K) -> Result<Instance<S, R>, E> + Send + Sync;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a [`Computation`].
///
/// Every call to a `Computation` constructor allocates a new id. Clones of a
/// computation share the id of the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComputationId(u64);

impl ComputationId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric value of this id.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// A selector factory together with the identity used to memoize it.
///
/// A computation builds a selector instance for a given entity id. The cache keys
/// its entries by the computation's [`ComputationId`], not by what the factory does:
/// two computations created from identical closures are distinct cache keys. Create
/// a computation once and reuse it (or clones of it) for every lookup.
///
/// # Type Parameters
///
/// * `K` - The entity id type.
/// * `S` - The state snapshot passed to built selectors.
/// * `R` - The value produced by built selectors.
/// * `E` - The error returned when the factory fails to build a selector.
///
/// # Examples
///
/// ```
/// use memoid::Computation;
///
/// let doubled = Computation::<u32, Vec<u32>, u32>::new(|id: &u32| {
///     let index = *id as usize;
///     move |state: &Vec<u32>| state[index] * 2
/// });
///
/// assert_eq!(doubled.id(), doubled.clone().id());
/// ```
pub struct Computation<K, S, R, E = Infallible> {
    id: ComputationId,
    factory: Arc<Factory<K, S, R, E>>,
}

impl<K, S, R> Computation<K, S, R, Infallible>
where
    K: 'static,
    S: 'static,
    R: 'static,
{
    /// Creates a computation from a factory that always succeeds.
    ///
    /// The factory receives the entity id and returns the selector instance for it.
    #[must_use]
    pub fn new<F, G>(factory: F) -> Self
    where
        F: Fn(&K) -> G + Send + Sync + 'static,
        G: Fn(&S) -> R + Send + Sync + 'static,
    {
        Self::from_factory(move |id: &K| -> Result<Instance<S, R>, Infallible> {
            let instance: Instance<S, R> = Arc::new(factory(id));
            Ok(instance)
        })
    }
}

impl<K, S, R, E> Computation<K, S, R, E>
where
    K: 'static,
    S: 'static,
    R: 'static,
    E: 'static,
{
    /// Creates a computation from a factory that can fail.
    ///
    /// A failed build is returned to the caller unchanged and nothing is cached,
    /// so the next lookup for the same entity id invokes the factory again.
    ///
    /// # Examples
    ///
    /// ```
    /// use memoid::Computation;
    ///
    /// let parsed = Computation::<String, (), u32, std::num::ParseIntError>::try_new(|id: &String| {
    ///     let value: u32 = id.parse()?;
    ///     Ok(move |_: &()| value)
    /// });
    /// # let _ = parsed;
    /// ```
    #[must_use]
    pub fn try_new<F, G>(factory: F) -> Self
    where
        F: Fn(&K) -> Result<G, E> + Send + Sync + 'static,
        G: Fn(&S) -> R + Send + Sync + 'static,
    {
        Self::from_factory(move |id: &K| -> Result<Instance<S, R>, E> {
            let instance: Instance<S, R> = Arc::new(factory(id)?);
            Ok(instance)
        })
    }

    fn from_factory(factory: impl Fn(&K) -> Result<Instance<S, R>, E> + Send + Sync + 'static) -> Self {
        Self {
            id: ComputationId::next(),
            factory: Arc::new(factory),
        }
    }
}

impl<K, S, R, E> Computation<K, S, R, E> {
    /// Returns the identity under which this computation is memoized.
    #[must_use]
    pub fn id(&self) -> ComputationId {
        self.id
    }

    pub(crate) fn build(&self, entity_id: &K) -> Result<Instance<S, R>, E> {
        (self.factory)(entity_id)
    }
}

impl<K, S, R, E> Clone for Computation<K, S, R, E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<K, S, R, E> Debug for Computation<K, S, R, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computation").field("id", &self.id).finish_non_exhaustive()
    }
}
