// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Recency-driven collection of stale entries.
//!
//! The collector has two states. It is [`CollectorStatus::Idle`] until the first
//! cache access arms it; arming only schedules the first pass and does not sweep.
//! Each pass waits one collection period on the cache clock, then for the host to
//! become idle, and then sweeps. A pass that leaves the store empty returns the
//! collector to `Idle`; otherwise the next pass is scheduled.

use std::{hash::Hash, sync::Weak, time::Duration};

use futures::future::{AbortHandle, AbortRegistration};
use tick::Clock;

use crate::{Idle, cache::Shared};

/// Whether the collector currently has a pass scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectorStatus {
    /// No pass is scheduled. The next cache access arms the collector.
    Idle,
    /// A pass is scheduled and the collector keeps rescheduling itself while the
    /// cache holds entries.
    Running,
}

/// Counters describing collector activity over the lifetime of a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorStats {
    sweeps: u64,
    evicted: u64,
}

impl CollectorStats {
    /// Number of sweep passes performed, scheduled or explicit.
    #[must_use]
    pub fn sweeps(&self) -> u64 {
        self.sweeps
    }

    /// Total number of entity ids evicted for staleness.
    #[must_use]
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

/// Outcome of a scheduled pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pass {
    Continue,
    Stop,
}

/// Handed out when the collector is armed; the caller spawns the pass loop with it.
#[derive(Debug)]
pub(crate) struct Armed {
    pub(crate) epoch: u64,
    pub(crate) registration: AbortRegistration,
}

#[derive(Debug)]
pub(crate) struct CollectorState {
    status: CollectorStatus,
    // Bumped on every arm so a loop from an earlier arming can tell it was superseded.
    epoch: u64,
    pending: Option<AbortHandle>,
    stats: CollectorStats,
}

impl CollectorState {
    pub(crate) fn new() -> Self {
        Self {
            status: CollectorStatus::Idle,
            epoch: 0,
            pending: None,
            stats: CollectorStats::default(),
        }
    }

    pub(crate) fn status(&self) -> CollectorStatus {
        self.status
    }

    pub(crate) fn stats(&self) -> CollectorStats {
        self.stats
    }

    /// Transitions `Idle -> Running`. Returns `None` when already running.
    pub(crate) fn arm(&mut self) -> Option<Armed> {
        if self.status == CollectorStatus::Running {
            return None;
        }

        let (handle, registration) = AbortHandle::new_pair();
        self.status = CollectorStatus::Running;
        self.epoch = self.epoch.wrapping_add(1);
        self.pending = Some(handle);

        Some(Armed {
            epoch: self.epoch,
            registration,
        })
    }

    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        self.status == CollectorStatus::Running && self.epoch == epoch
    }

    /// Called from the pass loop itself once the store is empty.
    pub(crate) fn disarm(&mut self) {
        self.status = CollectorStatus::Idle;
        self.pending = None;
    }

    /// Transitions to `Idle` and cancels the pending pass. Returns whether the
    /// collector was running.
    pub(crate) fn reset(&mut self) -> bool {
        let was_running = self.status == CollectorStatus::Running;
        self.status = CollectorStatus::Idle;

        if let Some(handle) = self.pending.take() {
            handle.abort();
        }

        was_running
    }

    pub(crate) fn record_sweep(&mut self, evicted: usize) {
        self.stats.sweeps = self.stats.sweeps.saturating_add(1);
        self.stats.evicted = self.stats.evicted.saturating_add(u64::try_from(evicted).unwrap_or(u64::MAX));
    }
}

/// Runs scheduled passes until the store is empty, the collector is reset, or the
/// cache is dropped.
pub(crate) async fn run<K>(owner: Weak<Shared<K>>, clock: Clock, idle: Idle, period: Duration, epoch: u64)
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
{
    loop {
        clock.delay(period).await;
        idle.wait().await;

        let Some(shared) = owner.upgrade() else {
            break;
        };

        if shared.sweep_pass(epoch) == Pass::Stop {
            break;
        }
    }
}
