// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(dead_code, reason = "shared by several test binaries")]

//! Shared helpers for integration tests.

use std::time::Duration;

use memoid::{Computation, Idle, SelectorCache};
use tick::ClockControl;

#[path = "../../src/testing/task_pool.rs"]
mod task_pool;

pub use task_pool::TaskPool;

pub const STALE: Duration = Duration::from_secs(60);
pub const GRACE: Duration = Duration::from_millis(100);

/// A controlled clock, a manual task pool, and a cache wired to both.
pub struct Harness {
    pub control: ClockControl,
    pub pool: TaskPool,
    pub cache: SelectorCache<String>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_idle(Idle::immediate())
    }

    pub fn with_idle(idle: Idle) -> Self {
        let control = ClockControl::new();
        let pool = TaskPool::new();
        let cache = SelectorCache::builder(control.to_clock(), pool.spawner())
            .stale_after(STALE)
            .grace(GRACE)
            .idle(idle)
            .build()
            .expect("valid configuration");

        Self { control, pool, cache }
    }

    /// Lets pending tasks register their timers, moves time forward, and lets the
    /// collector react.
    pub fn advance(&self, duration: Duration) {
        self.pool.run_until_stalled();
        self.control.advance(duration);
        self.pool.run_until_stalled();
    }
}

pub fn id(value: &str) -> String {
    value.to_string()
}

/// Selector returning the length of the entity id plus the state.
pub fn id_len() -> Computation<String, usize, usize> {
    Computation::new(|id: &String| {
        let len = id.len();
        move |state: &usize| len + state
    })
}
