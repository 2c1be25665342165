//! Synchronous, ordered delivery of lifecycle events.
//!
//! Each executor owns exactly one [`EventPublisher`]. Delivery is
//! synchronous: an event reaches every currently subscribed listener, in
//! subscription order, on the task that produced it, before the executor
//! takes its next step. Listeners registered after an event fired never see
//! it.
//!
//! Listener failures are isolated: a panicking listener is caught, logged
//! at `warn`, and delivery continues to the remaining listeners. A listener
//! can never turn a successful retry sequence into an error or vice versa.
//!
//! Registration and removal are safe while a dispatch is in flight: publish
//! snapshots the listener list and iterates the snapshot, so a listener
//! that unsubscribes mid-delivery still receives the event it was
//! subscribed for.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::event::{OutcomeKind, RetryEvent};

type Listener<T, E> = Arc<dyn Fn(&RetryEvent<T, E>) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

struct Registered<T, E> {
    id: u64,
    listener: Listener<T, E>,
}

struct Inner<T, E> {
    listeners: RwLock<Vec<Registered<T, E>>>,
    next_id: AtomicU64,
}

/// Ordered listener list for one executor's lifecycle events.
pub struct EventPublisher<T, E> {
    inner: Arc<Inner<T, E>>,
}

impl<T, E> Clone for EventPublisher<T, E> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T, E> fmt::Debug for EventPublisher<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPublisher").field("listeners", &self.listener_count()).finish()
    }
}

impl<T, E> EventPublisher<T, E> {
    fn listener_snapshot(&self) -> Vec<Listener<T, E>> {
        let guard = self.inner.listeners.read().expect("event listener list poisoned");
        guard.iter().map(|registered| registered.listener.clone()).collect()
    }

    /// Number of currently subscribed listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().expect("event listener list poisoned").len()
    }
}

impl<T, E> EventPublisher<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                listeners: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Register a listener for every lifecycle event.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: Fn(&RetryEvent<T, E>) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.inner.listeners.write().expect("event listener list poisoned");
        guard.push(Registered { id, listener: Arc::new(listener) });
        SubscriptionHandle(id)
    }

    /// Remove a listener. Returns false if the handle was already gone.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut guard = self.inner.listeners.write().expect("event listener list poisoned");
        let before = guard.len();
        guard.retain(|registered| registered.id != handle.0);
        guard.len() != before
    }

    /// Register a listener for accepted outcomes only.
    pub fn on_success<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: Fn(&RetryEvent<T, E>) + Send + Sync + 'static,
    {
        self.subscribe(move |event| {
            if event.outcome().is_success() {
                listener(event);
            }
        })
    }

    /// Register a listener for terminal failures and exhaustion only.
    pub fn on_error<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: Fn(&RetryEvent<T, E>) + Send + Sync + 'static,
    {
        self.subscribe(move |event| {
            if event.outcome().is_error() {
                listener(event);
            }
        })
    }

    /// Register a listener for retryable failures only.
    pub fn on_retry<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: Fn(&RetryEvent<T, E>) + Send + Sync + 'static,
    {
        self.subscribe(move |event| {
            if event.outcome() == OutcomeKind::RetryableFailure {
                listener(event);
            }
        })
    }

    pub(crate) fn publish(&self, event: &RetryEvent<T, E>) {
        for listener in self.listener_snapshot() {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                warn!(
                    target: "reattempt::events",
                    policy = %event.policy,
                    attempt = event.attempt,
                    "event listener panicked; delivery continues"
                );
            }
        }
    }
}
