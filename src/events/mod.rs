//! In-process publish/subscribe.
//!
//! [`EventBus`] delivers each published event synchronously to every handler
//! subscribed to the event's kind, in registration order. A handler that panics
//! is isolated: the panic is caught and logged, and the remaining handlers still
//! run. Events published with no subscriber are dropped.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use chrono::Utc;
//! use pulsewatch::events::{EventBus, EventKind, MonitorEvent, Publisher};
//! use pulsewatch::metrics::SystemSnapshot;
//!
//! let bus: EventBus<MonitorEvent> = EventBus::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&seen);
//! bus.subscribe(EventKind::Metrics, Arc::new(move |_event: &MonitorEvent| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! }));
//!
//! let delivered = bus.publish(&MonitorEvent::Metrics(SystemSnapshot::empty(Utc::now())));
//! assert_eq!(delivered, 1);
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! ```

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::alerts::Alert;
use crate::metrics::SystemSnapshot;

/// An event that can travel over an [`EventBus`].
pub trait Event: Send + Sync + 'static {
    /// Discriminant used for subscription.
    type Kind: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// The kind of this event.
    fn kind(&self) -> Self::Kind;
}

/// A subscribed event handler.
pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Identifies a subscription so it can be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Publish/subscribe contract.
pub trait Publisher<E: Event>: Send + Sync {
    /// Register `handler` for events of `kind`.
    fn subscribe(&self, kind: E::Kind, handler: Handler<E>) -> SubscriptionId;

    /// Remove a subscription. Returns `false` if it was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Deliver `event` to every handler subscribed to its kind.
    ///
    /// Returns the number of handlers that completed without panicking.
    fn publish(&self, event: &E) -> usize;
}

struct Subscription<E: Event> {
    id: SubscriptionId,
    kind: E::Kind,
    handler: Handler<E>,
}

/// Synchronous, ordered event bus.
pub struct EventBus<E: Event> {
    subscriptions: RwLock<Vec<Subscription<E>>>,
    next_id: AtomicU64,
}

impl<E: Event> EventBus<E> {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of handlers subscribed to `kind`.
    #[must_use]
    pub fn subscriber_count(&self, kind: E::Kind) -> usize {
        self.read_subscriptions(|subs| subs.iter().filter(|s| s.kind == kind).count())
    }

    /// Remove every subscription.
    pub fn clear(&self) {
        match self.subscriptions.write() {
            Ok(mut subs) => subs.clear(),
            Err(poison_error) => {
                tracing::warn!(
                    error = %poison_error,
                    "Clearing subscriptions from poisoned lock"
                );
                poison_error.into_inner().clear();
            }
        }
    }

    fn read_subscriptions<R>(&self, f: impl FnOnce(&[Subscription<E>]) -> R) -> R {
        match self.subscriptions.read() {
            Ok(subs) => f(&subs),
            Err(poison_error) => {
                tracing::warn!(
                    error = %poison_error,
                    "Reading subscriptions from poisoned lock, using recovered data"
                );
                f(&poison_error.into_inner())
            }
        }
    }
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.read_subscriptions(<[Subscription<E>]>::len);
        f.debug_struct("EventBus")
            .field("subscriptions", &count)
            .finish_non_exhaustive()
    }
}

impl<E: Event> Publisher<E> for EventBus<E> {
    fn subscribe(&self, kind: E::Kind, handler: Handler<E>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscription = Subscription { id, kind, handler };
        match self.subscriptions.write() {
            Ok(mut subs) => subs.push(subscription),
            Err(poison_error) => {
                tracing::warn!(
                    error = %poison_error,
                    "Subscribing on poisoned lock, using recovered data"
                );
                poison_error.into_inner().push(subscription);
            }
        }
        tracing::debug!(subscription = id.0, kind = %kind, "Handler subscribed");
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let remove = |subs: &mut Vec<Subscription<E>>| {
            let before = subs.len();
            subs.retain(|s| s.id != id);
            subs.len() != before
        };
        match self.subscriptions.write() {
            Ok(mut subs) => remove(&mut subs),
            Err(poison_error) => remove(&mut poison_error.into_inner()),
        }
    }

    fn publish(&self, event: &E) -> usize {
        let kind = event.kind();
        // Handlers run outside the lock so they may subscribe or publish themselves.
        let handlers: Vec<Handler<E>> = self.read_subscriptions(|subs| {
            subs.iter()
                .filter(|s| s.kind == kind)
                .map(|s| Arc::clone(&s.handler))
                .collect()
        });

        let mut completed = 0;
        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(()) => completed += 1,
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(ToString::to_string)
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!(kind = %kind, error = %message, "Event handler panicked");
                }
            }
        }
        completed
    }
}

/// Kinds of [`MonitorEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A new snapshot was produced.
    Metrics,
    /// A new alert was raised.
    Alert,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metrics => write!(f, "metrics"),
            Self::Alert => write!(f, "alert"),
        }
    }
}

/// Events broadcast by the monitoring pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum MonitorEvent {
    /// A snapshot was stored as current.
    Metrics(SystemSnapshot),
    /// An alert was appended to the alert log.
    Alert(Alert),
}

impl Event for MonitorEvent {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        match self {
            Self::Metrics(_) => EventKind::Metrics,
            Self::Alert(_) => EventKind::Alert,
        }
    }
}
