//! In-process publish/subscribe event bus.
//!
//! The [`EventBus`] maps each [`EventKind`] to an ordered list of subscriber
//! callbacks. Emitting an event invokes every callback registered for its
//! kind, in registration order, synchronously on the caller's task.
//!
//! # Failure isolation
//!
//! A subscriber that returns an error or panics is logged and skipped. The
//! remaining subscribers still run and nothing propagates to the emitter.
//!
//! # Async consumers
//!
//! Consumers that live in their own tasks can call [`EventBus::subscribe`]
//! to receive every emitted event over a tokio broadcast channel, after the
//! synchronous callbacks have run.
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use eventdesk_notify::bus::EventBus;
//! use eventdesk_notify::types::{AppEvent, EventKind};
//!
//! let bus = EventBus::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = Arc::clone(&seen);
//! let id = bus.on(EventKind::DashboardRefresh, move |event| {
//!     sink.lock().unwrap().push(event.kind());
//!     Ok(())
//! });
//!
//! let report = bus.emit(AppEvent::DashboardRefresh);
//! assert_eq!(report.delivered, 1);
//!
//! assert!(bus.off(EventKind::DashboardRefresh, id));
//! assert_eq!(bus.emit(AppEvent::DashboardRefresh).delivered, 0);
//! assert_eq!(seen.lock().unwrap().len(), 1);
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::broadcast::{self, Receiver, Sender};
use tracing::{debug, trace, warn};

use crate::config::DEFAULT_CHANNEL_CAPACITY;
use crate::types::{AppEvent, EventKind};

/// A subscriber callback.
pub type Subscriber = Arc<dyn Fn(&AppEvent) -> anyhow::Result<()> + Send + Sync>;

/// Handle identifying one registration, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Outcome of a single [`EventBus::emit`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EmitReport {
    /// Callbacks that completed successfully.
    pub delivered: usize,
    /// Callbacks that returned an error or panicked.
    pub failed: usize,
}

impl EmitReport {
    /// Total number of callbacks invoked.
    pub fn invoked(&self) -> usize {
        self.delivered + self.failed
    }
}

struct Registration {
    id: SubscriptionId,
    callback: Subscriber,
}

struct BusInner {
    listeners: RwLock<HashMap<EventKind, Vec<Registration>>>,
    next_id: AtomicU64,
    tap: Sender<AppEvent>,
}

/// Registry of event subscribers.
///
/// `EventBus` is cheap to clone; clones share one registry. Construct one at
/// application start and hand clones to the components that need it.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Creates an empty bus with the default async tap capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates an empty bus whose async tap buffers `capacity` events.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tap, _) = broadcast::channel(capacity);
        debug!(capacity, "Created event bus");
        Self {
            inner: Arc::new(BusInner {
                listeners: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                tap,
            }),
        }
    }

    /// Registers `callback` for events of `kind`.
    ///
    /// Callbacks for the same kind run in registration order. Registering the
    /// same closure twice yields two independent subscriptions.
    pub fn on<F>(&self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&AppEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.write()
            .entry(kind)
            .or_default()
            .push(Registration {
                id,
                callback: Arc::new(callback),
            });
        debug!(event = %kind, subscription = id.0, "Subscriber added");
        id
    }

    /// Removes the subscription `id` from `kind`.
    ///
    /// Returns `false` if nothing matched.
    pub fn off(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut listeners = self.write();
        let Some(registrations) = listeners.get_mut(&kind) else {
            return false;
        };

        let before = registrations.len();
        registrations.retain(|registration| registration.id != id);
        let removed = registrations.len() != before;

        if registrations.is_empty() {
            listeners.remove(&kind);
        }

        if removed {
            debug!(event = %kind, subscription = id.0, "Subscriber removed");
        }
        removed
    }

    /// Invokes every subscriber registered for the event's kind.
    ///
    /// The subscriber list is snapshotted before the first callback runs, so
    /// callbacks may freely call `on`, `off` or `emit` on this bus; changes
    /// take effect from the next emission.
    pub fn emit(&self, event: AppEvent) -> EmitReport {
        let kind = event.kind();
        let callbacks: Vec<(SubscriptionId, Subscriber)> = self
            .read()
            .get(&kind)
            .map(|registrations| {
                registrations
                    .iter()
                    .map(|r| (r.id, Arc::clone(&r.callback)))
                    .collect()
            })
            .unwrap_or_default();

        trace!(event = %kind, subscribers = callbacks.len(), "Emitting event");

        let mut report = EmitReport::default();
        for (id, callback) in callbacks {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(&event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    report.failed += 1;
                    warn!(
                        event = %kind,
                        subscription = id.0,
                        error = %err,
                        "Subscriber returned an error"
                    );
                }
                Err(payload) => {
                    report.failed += 1;
                    warn!(
                        event = %kind,
                        subscription = id.0,
                        panic = panic_message(payload.as_ref()),
                        "Subscriber panicked"
                    );
                }
            }
        }

        // No tap receivers is the common case
        let _ = self.inner.tap.send(event);

        report
    }

    /// Discards every subscription.
    pub fn clear(&self) {
        let mut listeners = self.write();
        let count: usize = listeners.values().map(Vec::len).sum();
        listeners.clear();
        debug!(removed = count, "Event bus cleared");
    }

    /// Number of subscribers registered for `kind`.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.read().get(&kind).map_or(0, Vec::len)
    }

    /// Returns `true` if no subscribers are registered for any kind.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().values().all(Vec::is_empty)
    }

    /// Returns a receiver for every event emitted after this call.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<AppEvent> {
        self.inner.tap.subscribe()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<EventKind, Vec<Registration>>> {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<EventKind, Vec<Registration>>> {
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.read();
        let counts: HashMap<&EventKind, usize> =
            listeners.iter().map(|(kind, r)| (kind, r.len())).collect();
        f.debug_struct("EventBus")
            .field("subscribers", &counts)
            .field("tap_receivers", &self.inner.tap.receiver_count())
            .finish()
    }
}

/// Best-effort text of a caught panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
