// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The selector cache and its shared state.

use std::{
    any::Any,
    fmt::Debug,
    hash::Hash,
    sync::Arc,
    time::{Duration, Instant},
};

use anyspawn::Spawner;
use futures::future::Abortable;
use parking_lot::Mutex;
use tick::Clock;

use crate::{
    Accessors, Computation, Idle, Selector,
    builder::{RecencySeed, SelectorCacheBuilder, Settings},
    collector::{self, Armed, CollectorState, CollectorStats, CollectorStatus, Pass},
    store::MemoStore,
    telemetry,
};

type ErasedSelector = Box<dyn Any + Send + Sync>;

/// Memoizes selectors per entity id and collects the ones that go unused.
///
/// A `SelectorCache` maps an entity id and a [`Computation`] to a cached
/// [`Selector`]. Asking for the same pair again returns the same selector instance
/// until the entity id is evicted. Eviction is driven by a background collector:
/// an entity id none of whose selectors has been called for longer than the
/// staleness window is dropped from the cache.
///
/// The collector is armed by the first access and disarms itself once the cache
/// is empty, so an unused cache does not keep a timer running. Collection passes
/// run on the cache's [`Spawner`], wait on the cache's [`Clock`], and are deferred
/// until the host is [`Idle`].
///
/// Cloning a `SelectorCache` is cheap and all clones share the same entries.
/// Dropping the last clone cancels any scheduled pass.
///
/// # Examples
///
/// ```
/// use anyspawn::Spawner;
/// use memoid::{Computation, SelectorCache};
/// use tick::Clock;
///
/// # fn main() -> Result<(), memoid::Error> {
/// // Production code would use `Spawner::new_tokio()` and `Clock::new_tokio()`.
/// let cache = SelectorCache::builder::<u32>(Clock::new_frozen(), Spawner::new_custom(|_task| {})).build()?;
///
/// let total = Computation::<u32, Vec<u32>, u32>::new(|id: &u32| {
///     let id = *id;
///     move |state: &Vec<u32>| state.iter().filter(|v| **v == id).count() as u32
/// });
///
/// let Ok(first) = cache.get_or_create(&total, &7);
/// let Ok(second) = cache.get_or_create(&total, &7);
///
/// assert!(memoid::Selector::ptr_eq(&first, &second));
/// assert_eq!(first.call(&vec![7, 1, 7]), 2);
/// # Ok(())
/// # }
/// ```
pub struct SelectorCache<K> {
    shared: Arc<Shared<K>>,
}

/// State shared between cache handles, selectors and the collector task.
pub(crate) struct Shared<K> {
    state: Mutex<State<K>>,
    settings: Settings,
    clock: Clock,
    spawner: Spawner,
    idle: Idle,
}

/// Everything that must change together lives behind one lock.
struct State<K> {
    store: MemoStore<K, ErasedSelector>,
    collector: CollectorState,
}

impl SelectorCache<()> {
    /// Creates a new cache builder.
    ///
    /// The clock provides the time used for recency and staleness, and the spawner
    /// runs the background collector.
    #[must_use]
    pub fn builder<K>(clock: Clock, spawner: Spawner) -> SelectorCacheBuilder<K> {
        SelectorCacheBuilder::new(clock, spawner)
    }
}

impl<K> SelectorCache<K>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
{
    pub(crate) fn new(settings: Settings, clock: Clock, spawner: Spawner, idle: Idle) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    store: MemoStore::new(),
                    collector: CollectorState::new(),
                }),
                settings,
                clock,
                spawner,
                idle,
            }),
        }
    }

    /// Returns the cached selector for `entity_id`, building it on first request.
    ///
    /// Retrieval does not count as a use; only [`Selector::call`] does. Every call
    /// arms the collector if it is idle.
    ///
    /// The factory runs without any cache lock held, so it may itself request
    /// selectors from this cache. If two callers race to build the same selector,
    /// the first one stored wins and both receive it.
    ///
    /// # Errors
    ///
    /// Returns the factory's error unchanged. Nothing is cached for a failed build,
    /// so the next request invokes the factory again.
    ///
    /// # Panics
    ///
    /// Panics if arming the collector spawns its task on a spawner that cannot run
    /// it here, such as `Spawner::new_tokio` outside of a Tokio runtime context.
    pub fn get_or_create<S, R, E>(&self, computation: &Computation<K, S, R, E>, entity_id: &K) -> Result<Selector<K, S, R>, E>
    where
        S: 'static,
        R: 'static,
    {
        self.shared.kick();

        if let Some(existing) = self.shared.lookup(computation, entity_id) {
            return Ok(existing);
        }

        let instance = computation.build(entity_id)?;
        let selector = Selector::new(entity_id.clone(), instance, Arc::downgrade(&self.shared));

        Ok(self.shared.insert(computation, entity_id, selector))
    }

    /// Binds `computation` to this cache.
    ///
    /// The returned [`Accessors`] create selectors for the computation and read
    /// them against a state snapshot.
    #[must_use]
    pub fn accessors<S, R, E>(&self, computation: Computation<K, S, R, E>) -> Accessors<K, S, R, E> {
        Accessors::new(self.clone(), computation)
    }

    /// Removes `entity_id` and all of its selectors. Returns whether it was cached.
    pub fn invalidate(&self, entity_id: &K) -> bool {
        self.shared.state.lock().store.remove(entity_id)
    }

    /// Removes every entity id from the cache.
    ///
    /// The collector keeps its state and goes idle on its next pass.
    pub fn clear(&self) {
        self.shared.state.lock().store.clear();
    }

    /// Runs one collection pass immediately and returns the number of evicted ids.
    ///
    /// This uses the same staleness rule as scheduled passes but leaves the
    /// collector's state and schedule untouched.
    pub fn collect_now(&self) -> usize {
        self.shared.collect_now()
    }

    /// Returns the collector to [`CollectorStatus::Idle`] and cancels its pending pass.
    ///
    /// Cached entries are kept. The next access arms the collector again.
    pub fn reset_collector(&self) {
        self.shared.reset();
    }

    /// Returns the number of cached entity ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.lock().store.len()
    }

    /// Returns `true` when no entity id is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().store.is_empty()
    }

    /// Returns `true` when at least one selector is cached for `entity_id`.
    #[must_use]
    pub fn contains(&self, entity_id: &K) -> bool {
        self.shared.state.lock().store.contains(entity_id)
    }

    /// Returns the number of cached selectors across all entity ids.
    #[must_use]
    pub fn selector_count(&self) -> usize {
        self.shared.state.lock().store.selector_count()
    }

    /// Returns when `entity_id` was last used, if it has a recency record.
    #[must_use]
    pub fn last_used(&self, entity_id: &K) -> Option<Instant> {
        self.shared.state.lock().store.last_used(entity_id)
    }
}

impl<K> SelectorCache<K> {
    /// Returns the current collector state.
    #[must_use]
    pub fn collector_status(&self) -> CollectorStatus {
        self.shared.state.lock().collector.status()
    }

    /// Returns collector activity counters.
    #[must_use]
    pub fn stats(&self) -> CollectorStats {
        self.shared.state.lock().collector.stats()
    }

    /// Returns the clock used for recency and scheduling.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.shared.clock
    }

    /// Returns how long an entity id may go unused before it is evicted.
    #[must_use]
    pub fn stale_after(&self) -> Duration {
        self.shared.settings.stale_after
    }

    /// Returns the slack added to the staleness window when scheduling passes.
    #[must_use]
    pub fn grace(&self) -> Duration {
        self.shared.settings.grace
    }

    /// Returns when newly cached entity ids receive their first timestamp.
    #[must_use]
    pub fn recency_seed(&self) -> RecencySeed {
        self.shared.settings.seed
    }
}

impl<K> Clone for SelectorCache<K> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K> Debug for SelectorCache<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectorCache")
            .field("settings", &self.shared.settings)
            .field("idle", &self.shared.idle)
            .finish_non_exhaustive()
    }
}

impl<K> Shared<K>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
{
    /// Arms the collector if it is idle and spawns its pass loop.
    fn kick(self: &Arc<Self>) {
        let armed = self.state.lock().collector.arm();
        self.start_passes(armed);
    }

    /// Spawns the pass loop for a fresh arming. Must be called without the lock held.
    fn start_passes(self: &Arc<Self>, armed: Option<Armed>) {
        let Some(armed) = armed else {
            return;
        };

        let period = self.settings.period;
        telemetry::armed(period);

        let passes = collector::run(Arc::downgrade(self), self.clock.clone(), self.idle.clone(), period, armed.epoch);
        let task = Abortable::new(passes, armed.registration);

        drop(self.spawner.spawn(async move {
            // Aborted by reset or by dropping the cache.
            let _ = task.await;
        }));
    }

    fn lookup<S, R, E>(&self, computation: &Computation<K, S, R, E>, entity_id: &K) -> Option<Selector<K, S, R>>
    where
        S: 'static,
        R: 'static,
    {
        let state = self.state.lock();
        state
            .store
            .get(entity_id, computation.id())?
            .downcast_ref::<Selector<K, S, R>>()
            .cloned()
    }

    /// Stores `selector` unless the pair is already cached and returns the stored one.
    ///
    /// A pass may have emptied the store and gone idle while the factory ran, so the
    /// collector is re-armed under the same lock that makes the store non-empty.
    fn insert<S, R, E>(
        self: &Arc<Self>,
        computation: &Computation<K, S, R, E>,
        entity_id: &K,
        selector: Selector<K, S, R>,
    ) -> Selector<K, S, R>
    where
        S: 'static,
        R: 'static,
    {
        let seed = match self.settings.seed {
            RecencySeed::OnCreate => Some(self.clock.instant()),
            RecencySeed::OnFirstUse => None,
        };

        let mut state = self.state.lock();
        let stored = state
            .store
            .insert(entity_id, computation.id(), Box::new(selector.clone()), seed)
            .downcast_ref::<Selector<K, S, R>>()
            .cloned()
            .unwrap_or(selector);
        let armed = state.collector.arm();
        drop(state);

        self.start_passes(armed);
        stored
    }

    pub(crate) fn touch(&self, entity_id: &K) {
        let now = self.clock.instant();
        self.state.lock().store.touch(entity_id, now);
    }

    /// Runs one scheduled pass for the loop armed at `epoch`.
    pub(crate) fn sweep_pass(&self, epoch: u64) -> Pass {
        let now = self.clock.instant();
        let mut state = self.state.lock();

        if !state.collector.is_current(epoch) {
            return Pass::Stop;
        }

        let evicted = state.store.sweep(now, self.settings.stale_after);
        state.collector.record_sweep(evicted);

        let remaining = state.store.len();
        let pass = if remaining == 0 {
            state.collector.disarm();
            Pass::Stop
        } else {
            Pass::Continue
        };
        drop(state);

        telemetry::sweep(evicted, remaining);
        if pass == Pass::Stop {
            telemetry::idle();
        }

        pass
    }

    fn collect_now(&self) -> usize {
        let now = self.clock.instant();
        let mut state = self.state.lock();

        let evicted = state.store.sweep(now, self.settings.stale_after);
        state.collector.record_sweep(evicted);
        let remaining = state.store.len();
        drop(state);

        telemetry::sweep(evicted, remaining);
        evicted
    }

    fn reset(&self) {
        let was_running = self.state.lock().collector.reset();
        telemetry::reset(was_running);
    }
}

impl<K> Drop for Shared<K> {
    fn drop(&mut self) {
        self.state.get_mut().collector.reset();
    }
}
