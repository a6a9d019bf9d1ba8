// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! [`Idle`] for deferring collection work until the host is not busy.

use std::{
    fmt::Debug,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

type BoxedFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type IdleFn = dyn Fn() -> BoxedFuture + Send + Sync;

/// Waits for the host's next idle opportunity.
///
/// The collector waits on `Idle` after its timer fires and before it sweeps, so
/// sweeping does not compete with latency-sensitive work. Hosts that know when they
/// are idle plug that knowledge in through [`Idle::new_custom`]; everyone else uses
/// one of the built-in fallbacks.
///
/// # Examples
///
/// ```
/// use memoid::Idle;
///
/// // Sweep as soon as the timer fires.
/// let immediate = Idle::immediate();
///
/// // Let other ready tasks run first.
/// let polite = Idle::yield_now();
///
/// // Defer to a host-provided idle signal.
/// let custom = Idle::new_custom(|| async {
///     // await the host's idle notification here
/// });
/// # let _ = (immediate, polite, custom);
/// ```
#[derive(Debug, Clone)]
pub struct Idle(IdleKind);

#[derive(Clone)]
enum IdleKind {
    Immediate,
    Yield,
    Custom(Arc<IdleFn>),
}

impl Debug for IdleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate => f.write_str("Immediate"),
            Self::Yield => f.write_str("Yield"),
            Self::Custom(_) => f.debug_struct("Custom").finish_non_exhaustive(),
        }
    }
}

impl Idle {
    /// Proceeds without waiting.
    #[must_use]
    pub fn immediate() -> Self {
        Self(IdleKind::Immediate)
    }

    /// Yields to the executor once before proceeding.
    ///
    /// This lets tasks that are already ready run ahead of the sweep.
    #[must_use]
    pub fn yield_now() -> Self {
        Self(IdleKind::Yield)
    }

    /// Defers to a host-provided idle signal.
    ///
    /// The closure is called once per collection pass. The returned future should
    /// complete when the host is next idle.
    pub fn new_custom<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self(IdleKind::Custom(Arc::new(move || -> BoxedFuture { Box::pin(f()) })))
    }

    pub(crate) fn wait(&self) -> IdleWait {
        match &self.0 {
            IdleKind::Immediate => IdleWait::Ready,
            IdleKind::Yield => IdleWait::Yield { yielded: false },
            IdleKind::Custom(f) => IdleWait::Custom(f()),
        }
    }
}

impl Default for Idle {
    fn default() -> Self {
        Self::yield_now()
    }
}

pub(crate) enum IdleWait {
    Ready,
    Yield { yielded: bool },
    Custom(BoxedFuture),
}

impl Future for IdleWait {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.get_mut() {
            Self::Ready | Self::Yield { yielded: true } => Poll::Ready(()),
            Self::Yield { yielded } => {
                *yielded = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
            Self::Custom(fut) => fut.as_mut().poll(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use futures::FutureExt;

    use super::*;

    #[test]
    fn immediate_is_ready_on_first_poll() {
        assert_eq!(Idle::immediate().wait().now_or_never(), Some(()));
    }

    #[test]
    fn yield_now_is_pending_once() {
        let mut wait = Idle::yield_now().wait();
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());

        assert!(Pin::new(&mut wait).poll(&mut cx).is_pending());
        assert!(Pin::new(&mut wait).poll(&mut cx).is_ready());
    }

    #[test]
    fn custom_calls_closure_per_wait() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let idle = Idle::new_custom(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async {}
        });

        assert_eq!(idle.wait().now_or_never(), Some(()));
        assert_eq!(idle.wait().now_or_never(), Some(()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn custom_waits_until_host_is_idle() {
        let busy = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&busy);
        let idle = Idle::new_custom(move || {
            let flag = Arc::clone(&flag);
            futures::future::poll_fn(move |_| {
                if flag.load(Ordering::SeqCst) {
                    Poll::Pending
                } else {
                    Poll::Ready(())
                }
            })
        });

        let mut wait = idle.wait();
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        assert!(Pin::new(&mut wait).poll(&mut cx).is_pending());

        busy.store(false, Ordering::SeqCst);
        assert!(Pin::new(&mut wait).poll(&mut cx).is_ready());
    }

    #[test]
    fn debug_names_kind() {
        assert!(format!("{:?}", Idle::immediate()).contains("Immediate"));
        assert!(format!("{:?}", Idle::default()).contains("Yield"));
        assert!(format!("{:?}", Idle::new_custom(|| async {})).contains("Custom"));
    }
}
