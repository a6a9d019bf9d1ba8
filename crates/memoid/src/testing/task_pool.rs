// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Manual task pool shared by unit and integration tests.

use std::{pin::Pin, sync::Arc, task::Context};

use anyspawn::Spawner;
use parking_lot::Mutex;

type Task = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Polls spawned tasks by hand so tests control exactly when the collector runs.
#[derive(Clone, Default)]
pub struct TaskPool {
    tasks: Arc<Mutex<Vec<Task>>>,
}

impl TaskPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawner(&self) -> Spawner {
        let tasks = Arc::clone(&self.tasks);
        Spawner::new_custom(move |task| tasks.lock().push(task))
    }

    /// Number of tasks that have not completed yet.
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Polls every task until none of them can make progress at the current time.
    ///
    /// Tasks spawned while polling are picked up in the next round.
    pub fn run_until_stalled(&self) {
        const ROUNDS: usize = 4;
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());

        for _ in 0..ROUNDS {
            let batch = std::mem::take(&mut *self.tasks.lock());
            let mut pending: Vec<Task> = batch
                .into_iter()
                .filter_map(|mut task| task.as_mut().poll(&mut cx).is_pending().then_some(task))
                .collect();

            let mut tasks = self.tasks.lock();
            pending.append(&mut tasks);
            *tasks = pending;
        }
    }
}
