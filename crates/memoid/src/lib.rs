// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Per-entity memoization of selectors with idle-time collection.
//!
//! A *selector* is a function that derives a value from a state snapshot. Many
//! selectors are parameterized by an entity id ("the unread count of thread 42"),
//! and rebuilding them for every read throws away whatever they memoize
//! internally. This crate keeps one selector instance per entity id and
//! [`Computation`], hands the same instance back on every request, and drops the
//! entity ids nobody has called a selector for in a while.
//!
//! - [`Computation`] wraps a selector factory and gives it a stable identity.
//! - [`SelectorCache`] stores the built [`Selector`]s and tracks when each entity
//!   id was last used.
//! - A background collector, armed on first access, periodically evicts entity ids
//!   that have gone unused for longer than the staleness window. It runs on an
//!   [`anyspawn::Spawner`], measures time with a [`tick::Clock`], and defers each
//!   pass until the host is [`Idle`].
//! - [`Accessors`] bind a computation to a cache for callers that only need
//!   "make a selector" and "read a value".
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use anyspawn::Spawner;
//! use memoid::{Computation, Selector, SelectorCache};
//! use tick::Clock;
//!
//! # fn main() -> Result<(), memoid::Error> {
//! struct Inbox {
//!     unread: Vec<(u64, String)>,
//! }
//!
//! // Production code would use `Clock::new_tokio()` and `Spawner::new_tokio()`.
//! let cache = SelectorCache::builder::<u64>(Clock::new_frozen(), Spawner::new_custom(|_task| {}))
//!     .stale_after(Duration::from_secs(60))
//!     .build()?;
//!
//! let unread_count = Computation::<u64, Inbox, usize>::new(|thread: &u64| {
//!     let thread = *thread;
//!     move |inbox: &Inbox| inbox.unread.iter().filter(|(t, _)| *t == thread).count()
//! });
//!
//! let inbox = Inbox {
//!     unread: vec![(42, "hi".into()), (7, "yo".into()), (42, "ping".into())],
//! };
//!
//! let Ok(selector) = cache.get_or_create(&unread_count, &42);
//! assert_eq!(selector.call(&inbox), 2);
//!
//! let Ok(again) = cache.get_or_create(&unread_count, &42);
//! assert!(Selector::ptr_eq(&selector, &again));
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `logs` (default): emits `tracing` events for collector activity.
//! - `tokio` (default): enables `Spawner::new_tokio` and `Clock::new_tokio`.
//! - `custom`: enables `Spawner::new_custom` for hosts that bring their own executor.

mod accessors;
mod builder;
mod cache;
mod collector;
mod computation;
mod error;
mod idle;
mod selector;
mod store;
mod telemetry;

#[cfg(test)]
mod testing;

pub use accessors::{Accessors, MakeSelectorFn, ReadFn};
pub use builder::{DEFAULT_GRACE, DEFAULT_STALE_AFTER, RecencySeed, SelectorCacheBuilder};
pub use cache::SelectorCache;
pub use collector::{CollectorStats, CollectorStatus};
pub use computation::{Computation, ComputationId};
pub use error::{Error, Result};
pub use idle::Idle;
pub use selector::Selector;
