// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring a [`SelectorCache`].

use std::{hash::Hash, marker::PhantomData, time::Duration};

use anyspawn::Spawner;
use tick::Clock;

use crate::{Error, Idle, Result, SelectorCache};

/// Default time since last use after which an entity id is considered stale.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60);

/// Default slack added to [`DEFAULT_STALE_AFTER`] when scheduling the next pass.
pub const DEFAULT_GRACE: Duration = Duration::from_millis(100);

/// When a newly cached entity id receives its first recency timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RecencySeed {
    /// Creating the first selector for an id counts as a use. Selectors that are
    /// created but never called are collected once they go stale.
    #[default]
    OnCreate,
    /// Only calling a selector counts as a use. Entity ids whose selectors are never
    /// called have no timestamp and are never collected.
    OnFirstUse,
}

/// Validated configuration shared by the cache and its collector.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Settings {
    pub(crate) stale_after: Duration,
    pub(crate) grace: Duration,
    pub(crate) period: Duration,
    pub(crate) seed: RecencySeed,
}

/// Builder for a [`SelectorCache`].
///
/// Created by [`SelectorCache::builder`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use anyspawn::Spawner;
/// use memoid::{Idle, RecencySeed, SelectorCache};
/// use tick::Clock;
///
/// let cache = SelectorCache::builder::<String>(Clock::new_frozen(), Spawner::new_custom(|_task| {}))
///     .stale_after(Duration::from_secs(300))
///     .grace(Duration::from_secs(1))
///     .idle(Idle::immediate())
///     .recency_seed(RecencySeed::OnFirstUse)
///     .build()?;
///
/// assert_eq!(cache.stale_after(), Duration::from_secs(300));
/// # Ok::<(), memoid::Error>(())
/// ```
#[derive(Debug)]
pub struct SelectorCacheBuilder<K> {
    clock: Clock,
    spawner: Spawner,
    idle: Idle,
    stale_after: Duration,
    grace: Duration,
    seed: RecencySeed,
    _phantom: PhantomData<fn() -> K>,
}

impl<K> SelectorCacheBuilder<K> {
    pub(crate) fn new(clock: Clock, spawner: Spawner) -> Self {
        Self {
            clock,
            spawner,
            idle: Idle::default(),
            stale_after: DEFAULT_STALE_AFTER,
            grace: DEFAULT_GRACE,
            seed: RecencySeed::default(),
            _phantom: PhantomData,
        }
    }

    /// Sets how long an entity id may go unused before it is evicted.
    ///
    /// Defaults to [`DEFAULT_STALE_AFTER`].
    #[must_use]
    pub fn stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Sets the slack added to the staleness window when scheduling the next pass.
    ///
    /// Defaults to [`DEFAULT_GRACE`].
    #[must_use]
    pub fn grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Sets how the collector waits for the host to become idle before sweeping.
    ///
    /// Defaults to [`Idle::yield_now`].
    #[must_use]
    pub fn idle(mut self, idle: Idle) -> Self {
        self.idle = idle;
        self
    }

    /// Sets when a newly cached entity id gets its first recency timestamp.
    ///
    /// Defaults to [`RecencySeed::OnCreate`].
    #[must_use]
    pub fn recency_seed(mut self, seed: RecencySeed) -> Self {
        self.seed = seed;
        self
    }

    /// Builds the cache.
    ///
    /// # Errors
    ///
    /// Returns an error when the collection period, `stale_after + grace`, is zero
    /// or does not fit in a [`Duration`].
    pub fn build(self) -> Result<SelectorCache<K>>
    where
        K: Clone + Eq + Hash + Send + Sync + 'static,
    {
        let settings = self.settings()?;
        Ok(SelectorCache::new(settings, self.clock, self.spawner, self.idle))
    }

    fn settings(&self) -> Result<Settings> {
        let period = self.stale_after.checked_add(self.grace).ok_or_else(|| {
            Error::caused_by(format!(
                "collection period overflows: stale_after {:?} + grace {:?}",
                self.stale_after, self.grace
            ))
        })?;

        if period.is_zero() {
            return Err(Error::caused_by("collection period must be non-zero"));
        }

        Ok(Settings {
            stale_after: self.stale_after,
            grace: self.grace,
            period,
            seed: self.seed,
        })
    }
}
