// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured log events for collector activity.
//!
//! Events are emitted through `tracing` when the `logs` feature is enabled. Field
//! names are shared constants so tests and log processors agree on them.

#![cfg_attr(
    not(any(feature = "logs", test)),
    expect(unused_variables, dead_code, reason = "events are compiled out without the logs feature")
)]

use std::time::Duration;

pub(crate) const ARMED_EVENT: &str = "memoid.collector.armed";
pub(crate) const SWEEP_EVENT: &str = "memoid.collector.sweep";
pub(crate) const IDLE_EVENT: &str = "memoid.collector.idle";
pub(crate) const RESET_EVENT: &str = "memoid.collector.reset";

pub(crate) fn armed(period: Duration) {
    #[cfg(any(feature = "logs", test))]
    tracing::event!(
        name: ARMED_EVENT,
        tracing::Level::DEBUG,
        memoid.period = period.as_secs_f64(),
        "{ARMED_EVENT}"
    );
}

pub(crate) fn sweep(evicted: usize, remaining: usize) {
    #[cfg(any(feature = "logs", test))]
    tracing::event!(
        name: SWEEP_EVENT,
        tracing::Level::DEBUG,
        memoid.evicted = evicted,
        memoid.remaining = remaining,
        "{SWEEP_EVENT}"
    );
}

pub(crate) fn idle() {
    #[cfg(any(feature = "logs", test))]
    tracing::event!(name: IDLE_EVENT, tracing::Level::DEBUG, "{IDLE_EVENT}");
}

pub(crate) fn reset(was_running: bool) {
    #[cfg(any(feature = "logs", test))]
    tracing::event!(
        name: RESET_EVENT,
        tracing::Level::INFO,
        memoid.was_running = was_running,
        "{RESET_EVENT}"
    );
}
