// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error type for selector cache configuration.

/// An error raised while configuring a [`SelectorCache`](crate::SelectorCache).
///
/// Cache operations themselves never fail; failures of user-supplied factories are
/// returned to the caller unchanged. This type only covers invalid configuration
/// detected by [`SelectorCacheBuilder::build`](crate::SelectorCacheBuilder::build).
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use anyspawn::Spawner;
/// use memoid::SelectorCache;
/// use tick::Clock;
///
/// let error = SelectorCache::builder::<u32>(Clock::new_frozen(), Spawner::new_custom(|_task| {}))
///     .stale_after(Duration::ZERO)
///     .grace(Duration::ZERO)
///     .build()
///     .expect_err("a zero collection period is rejected");
///
/// assert!(error.to_string().contains("non-zero"));
/// ```
#[ohno::error]
pub struct Error {}

/// A specialized [`Result`] type for selector cache configuration.
pub type Result<T> = std::result::Result<T, Error>;
