//! Toast notification pipeline.
//!
//! Toasts flow through two components:
//!
//! - [`ToastDispatcher`] - broadcasts [`ToastRequest`]s to whoever is mounted.
//!   Any component holding a clone can raise a toast without knowing how it
//!   is displayed.
//! - [`ToastContainer`] - the list of visible toasts. It assigns each toast a
//!   unique id, enforces the [`ToastPolicy`], and removes toasts when their
//!   timer fires or when they are dismissed.
//!
//! A container is connected to a dispatcher with [`ToastContainer::mount`],
//! which returns a [`MountedContainer`] guard. Dropping or unmounting the
//! guard stops delivery and cancels every pending expiry timer.
//!
//! # Timers
//!
//! Each toast owns one tokio task that sleeps for the toast's duration and
//! then removes it. Dismissal, eviction, [`ToastContainer::clear`] and
//! teardown abort that task, so a timer never fires against a toast that is
//! already gone. Timer tasks only hold a weak reference to the container.
//!
//! # Example
//!
//! ```rust
//! use eventdesk_notify::config::ToastPolicy;
//! use eventdesk_notify::toast::{ToastContainer, ToastDispatcher};
//! use eventdesk_notify::types::ToastKind;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let dispatcher = ToastDispatcher::new();
//! let mounted = ToastContainer::new(ToastPolicy::default()).mount(&dispatcher);
//!
//! dispatcher.show_toast("Vendor saved", ToastKind::Success);
//! tokio::task::yield_now().await;
//!
//! let visible = mounted.container().visible();
//! assert_eq!(visible.len(), 1);
//! assert_eq!(visible[0].kind, ToastKind::Success);
//! # }
//! ```

use std::collections::VecDeque;
use std::error::Error;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError, Receiver, Sender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::config::{duration_millis, ToastPolicy, DEFAULT_CHANNEL_CAPACITY};
use crate::types::{
    coerce_message, ToastId, ToastKind, ToastRecord, ToastRequest, FALLBACK_MESSAGE,
};

/// Broadcasts toast requests to mounted containers.
///
/// `ToastDispatcher` is `Clone`, `Send` and `Sync`; clones share one channel.
/// Raising a toast never blocks and never fails. With no container mounted
/// the request is dropped.
#[derive(Debug, Clone)]
pub struct ToastDispatcher {
    sender: Sender<ToastRequest>,
}

impl ToastDispatcher {
    /// Creates a dispatcher with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a dispatcher whose channel buffers `capacity` requests.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        debug!(capacity, "Created toast dispatcher");
        Self { sender }
    }

    /// Receives every request dispatched after this call.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<ToastRequest> {
        self.sender.subscribe()
    }

    /// Number of live receivers, normally the mounted containers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Broadcasts a prepared request.
    ///
    /// Returns how many receivers got it, 0 if nothing is mounted.
    pub fn dispatch(&self, request: ToastRequest) -> usize {
        trace!(
            kind = %request.kind,
            message = %request.message,
            "Dispatching toast"
        );

        match self.sender.send(request) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("No toast container mounted, toast dropped");
                0
            }
        }
    }

    /// Raises a toast with the container's default duration.
    pub fn show_toast(&self, message: impl Into<String>, kind: ToastKind) -> usize {
        self.dispatch(ToastRequest::new(message, kind))
    }

    /// Raises a toast, optionally overriding how long it stays visible.
    pub fn show(
        &self,
        message: impl Into<String>,
        kind: ToastKind,
        duration: Option<Duration>,
    ) -> usize {
        let request = ToastRequest::new(message, kind);
        self.dispatch(match duration {
            Some(duration) => request.with_duration(duration),
            None => request,
        })
    }

    pub fn info(&self, message: impl Into<String>) -> usize {
        self.show_toast(message, ToastKind::Info)
    }

    pub fn success(&self, message: impl Into<String>) -> usize {
        self.show_toast(message, ToastKind::Success)
    }

    pub fn warning(&self, message: impl Into<String>) -> usize {
        self.show_toast(message, ToastKind::Warning)
    }

    pub fn error(&self, message: impl Into<String>) -> usize {
        self.show_toast(message, ToastKind::Error)
    }

    /// Info toast visible for `duration` instead of the policy default.
    pub fn info_for(&self, message: impl Into<String>, duration: Duration) -> usize {
        self.show(message, ToastKind::Info, Some(duration))
    }

    pub fn success_for(&self, message: impl Into<String>, duration: Duration) -> usize {
        self.show(message, ToastKind::Success, Some(duration))
    }

    pub fn warning_for(&self, message: impl Into<String>, duration: Duration) -> usize {
        self.show(message, ToastKind::Warning, Some(duration))
    }

    pub fn error_for(&self, message: impl Into<String>, duration: Duration) -> usize {
        self.show(message, ToastKind::Error, Some(duration))
    }

    /// Raises a toast from an arbitrary JSON value.
    ///
    /// See [`coerce_message`] for how the text is extracted.
    pub fn show_value(&self, message: &Value, kind: ToastKind) -> usize {
        self.show_toast(coerce_message(message), kind)
    }

    /// Raises an error toast describing `err`.
    pub fn show_error(&self, err: &dyn Error) -> usize {
        let text = err.to_string();
        if text.trim().is_empty() {
            self.error(FALLBACK_MESSAGE)
        } else {
            self.error(text)
        }
    }
}

impl Default for ToastDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// A visible toast and the task that will expire it.
#[derive(Debug)]
struct ActiveToast {
    record: ToastRecord,
    timer: Option<JoinHandle<()>>,
}

impl ActiveToast {
    fn cancel(mut self) -> ToastRecord {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.record
    }
}

#[derive(Debug)]
struct ContainerInner {
    toasts: Mutex<VecDeque<ActiveToast>>,
    policy: ToastPolicy,
    revision: watch::Sender<u64>,
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        let toasts = self
            .toasts
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for toast in toasts.drain(..) {
            toast.cancel();
        }
    }
}

/// The list of currently visible toasts.
///
/// Cheap to clone; clones share one list. Records are kept in insertion
/// order, oldest first.
#[derive(Debug, Clone)]
pub struct ToastContainer {
    inner: Arc<ContainerInner>,
}

impl ToastContainer {
    /// Creates an empty container governed by `policy`.
    #[must_use]
    pub fn new(policy: ToastPolicy) -> Self {
        let (revision, _) = watch::channel(0);
        debug!(
            max_visible = policy.max_visible,
            default_duration_ms = policy.default_duration_ms(),
            "Created toast container"
        );
        Self {
            inner: Arc::new(ContainerInner {
                toasts: Mutex::new(VecDeque::new()),
                policy,
                revision,
            }),
        }
    }

    /// Connects this container to `dispatcher`.
    ///
    /// The subscription is in place when this returns, so toasts dispatched
    /// right afterwards are delivered.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use = "dropping the guard unmounts the container"]
    pub fn mount(&self, dispatcher: &ToastDispatcher) -> MountedContainer {
        let mut rx = dispatcher.subscribe();
        let container = self.clone();

        let listener = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(request) => {
                        container.push(request);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Toast container fell behind, toasts dropped");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Toast dispatcher closed");
                        break;
                    }
                }
            }
        });

        debug!("Toast container mounted");
        MountedContainer {
            container: self.clone(),
            listener,
        }
    }

    /// Appends a toast and schedules its expiry.
    ///
    /// If the container is full, the oldest toasts are evicted first. Outside
    /// a tokio runtime no timer is scheduled and the toast stays until it is
    /// dismissed or evicted.
    pub fn push(&self, request: ToastRequest) -> ToastRecord {
        let policy = self.inner.policy;
        let duration = request.duration().unwrap_or(policy.default_duration);

        let mut toasts = self.lock();

        let mut id = ToastId::generate(request.timestamp);
        while toasts.iter().any(|toast| toast.record.id == id) {
            id = ToastId::generate(request.timestamp);
        }

        let record = ToastRecord {
            id,
            message: request.message,
            kind: request.kind,
            timestamp: request.timestamp,
            duration_ms: duration_millis(duration),
        };

        while toasts.len() >= policy.max_visible {
            let Some(oldest) = toasts.pop_front() else {
                break;
            };
            let evicted = oldest.cancel();
            trace!(toast_id = %evicted.id, "Evicted oldest toast");
        }

        let timer = self.schedule_expiry(record.id.clone(), duration);
        toasts.push_back(ActiveToast {
            record: record.clone(),
            timer,
        });
        drop(toasts);

        trace!(
            toast_id = %record.id,
            kind = %record.kind,
            duration_ms = record.duration_ms,
            "Toast shown"
        );
        self.bump();
        record
    }

    /// Removes a toast before its timer fires.
    ///
    /// Returns `false` if the toast is already gone.
    pub fn dismiss(&self, id: &ToastId) -> bool {
        let removed = self.take(id).map(ActiveToast::cancel);
        match removed {
            Some(record) => {
                trace!(toast_id = %record.id, "Toast dismissed");
                self.bump();
                true
            }
            None => {
                trace!(toast_id = %id, "Dismissed toast was already gone");
                false
            }
        }
    }

    /// Removes every toast and cancels their timers.
    pub fn clear(&self) {
        let drained: Vec<ActiveToast> = self.lock().drain(..).collect();
        if drained.is_empty() {
            return;
        }
        let count = drained.len();
        for toast in drained {
            toast.cancel();
        }
        debug!(removed = count, "Toast container cleared");
        self.bump();
    }

    /// Snapshot of the visible toasts, oldest first.
    #[must_use]
    pub fn visible(&self) -> Vec<ToastRecord> {
        self.lock()
            .iter()
            .map(|toast| toast.record.clone())
            .collect()
    }

    #[must_use]
    pub fn get(&self, id: &ToastId) -> Option<ToastRecord> {
        self.lock()
            .iter()
            .find(|toast| &toast.record.id == id)
            .map(|toast| toast.record.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[must_use]
    pub fn policy(&self) -> ToastPolicy {
        self.inner.policy
    }

    /// Receives a revision number that increases on every change to the list.
    #[must_use]
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    fn schedule_expiry(&self, id: ToastId, duration: Duration) -> Option<JoinHandle<()>> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(toast_id = %id, "No async runtime, toast will not expire on its own");
            return None;
        };

        let weak: Weak<ContainerInner> = Arc::downgrade(&self.inner);
        Some(runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(inner) = weak.upgrade() {
                ToastContainer { inner }.expire(&id);
            }
        }))
    }

    /// Timer callback: removes the toast without aborting the running timer.
    fn expire(&self, id: &ToastId) {
        match self.take(id) {
            Some(mut toast) => {
                toast.timer.take();
                trace!(toast_id = %id, "Toast expired");
                self.bump();
            }
            None => trace!(toast_id = %id, "Expired toast was already gone"),
        }
    }

    fn take(&self, id: &ToastId) -> Option<ActiveToast> {
        let mut toasts = self.lock();
        let index = toasts.iter().position(|toast| &toast.record.id == id)?;
        toasts.remove(index)
    }

    fn bump(&self) {
        self.inner.revision.send_modify(|revision| *revision += 1);
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ActiveToast>> {
        self.inner
            .toasts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Guard for a container connected to a dispatcher.
///
/// Dropping the guard stops delivery and clears the container, cancelling
/// every pending timer.
#[derive(Debug)]
pub struct MountedContainer {
    container: ToastContainer,
    listener: JoinHandle<()>,
}

impl MountedContainer {
    pub fn container(&self) -> &ToastContainer {
        &self.container
    }

    /// Returns `true` while the container is still receiving toasts.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        !self.listener.is_finished()
    }

    /// Disconnects from the dispatcher and clears the container.
    pub fn unmount(self) {
        debug!("Unmounting toast container");
        drop(self);
    }
}

impl Drop for MountedContainer {
    fn drop(&mut self) {
        self.listener.abort();
        self.container.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    /// Lets the listener task drain the dispatcher channel.
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    fn mount_with(policy: ToastPolicy) -> (ToastDispatcher, MountedContainer) {
        let dispatcher = ToastDispatcher::new();
        let mounted = ToastContainer::new(policy).mount(&dispatcher);
        (dispatcher, mounted)
    }

    // ========================================================================
    // ToastDispatcher tests
    // ========================================================================

    #[test]
    fn dispatch_without_container_returns_zero() {
        let dispatcher = ToastDispatcher::new();
        assert_eq!(dispatcher.info("nobody listening"), 0);
    }

    #[tokio::test]
    async fn dispatch_reaches_subscriber_with_timestamp() {
        let dispatcher = ToastDispatcher::new();
        let mut rx = dispatcher.subscribe();
        let before = Utc::now();

        assert_eq!(dispatcher.show_toast("hi", ToastKind::Success), 1);

        let request = rx.recv().await.unwrap();
        assert_eq!(request.message, "hi");
        assert_eq!(request.kind, ToastKind::Success);
        assert!(request.timestamp >= before);
        assert_eq!(request.duration_ms, None);
    }

    #[tokio::test]
    async fn helpers_set_kind() {
        let dispatcher = ToastDispatcher::new();
        let mut rx = dispatcher.subscribe();

        dispatcher.info("a");
        dispatcher.success("b");
        dispatcher.warning("c");
        dispatcher.error("d");

        let kinds: Vec<ToastKind> = [(); 4]
            .iter()
            .map(|_| rx.try_recv().unwrap().kind)
            .collect();
        assert_eq!(kinds, ToastKind::ALL.to_vec());
    }

    #[tokio::test]
    async fn show_value_falls_back_for_non_strings() {
        let dispatcher = ToastDispatcher::new();
        let mut rx = dispatcher.subscribe();

        dispatcher.show_value(&json!({ "not": "a string" }), ToastKind::Error);
        dispatcher.show_value(&json!({ "message": "Upload failed" }), ToastKind::Error);

        assert_eq!(rx.try_recv().unwrap().message, "An error occurred");
        assert_eq!(rx.try_recv().unwrap().message, "Upload failed");
    }

    #[tokio::test]
    async fn show_error_uses_display_text() {
        let dispatcher = ToastDispatcher::new();
        let mut rx = dispatcher.subscribe();

        let err = std::io::Error::other("disk full");
        dispatcher.show_error(&err);

        let request = rx.try_recv().unwrap();
        assert_eq!(request.kind, ToastKind::Error);
        assert_eq!(request.message, "disk full");
    }

    #[tokio::test]
    async fn show_error_with_empty_display_falls_back() {
        #[derive(Debug)]
        struct Silent;

        impl std::fmt::Display for Silent {
            fn fmt(&self, _: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                Ok(())
            }
        }

        impl Error for Silent {}

        let dispatcher = ToastDispatcher::new();
        let mut rx = dispatcher.subscribe();

        dispatcher.show_error(&Silent);

        let request = rx.try_recv().unwrap();
        assert_eq!(request.kind, ToastKind::Error);
        assert_eq!(request.message, FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn duration_helpers_set_kind_and_override() {
        let dispatcher = ToastDispatcher::new();
        let mut rx = dispatcher.subscribe();
        let quick = Duration::from_millis(1_500);

        dispatcher.info_for("a", quick);
        dispatcher.success_for("b", quick);
        dispatcher.warning_for("c", quick);
        dispatcher.error_for("d", quick);

        for kind in ToastKind::ALL {
            let request = rx.try_recv().unwrap();
            assert_eq!(request.kind, kind);
            assert_eq!(request.duration_ms, Some(1_500));
        }
    }

    #[tokio::test]
    async fn show_with_duration_sets_override() {
        let dispatcher = ToastDispatcher::new();
        let mut rx = dispatcher.subscribe();

        dispatcher.show("quick", ToastKind::Info, Some(Duration::from_millis(750)));

        assert_eq!(rx.try_recv().unwrap().duration_ms, Some(750));
    }

    // ========================================================================
    // ToastContainer tests
    // ========================================================================

    #[tokio::test(start_paused = true)]
    async fn show_toast_appears_then_expires() {
        let (dispatcher, mounted) = mount_with(ToastPolicy::default());

        dispatcher.show_toast("hi", ToastKind::Success);
        settle().await;

        let visible = mounted.container().visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].kind, ToastKind::Success);
        assert_eq!(visible[0].message, "hi");
        assert_eq!(visible[0].duration_ms, 5_000);

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(mounted.container().len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        settle().await;
        assert!(mounted.container().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_removes_early_and_cancels_timer() {
        let container = ToastContainer::new(ToastPolicy::default());
        let record = container.push(ToastRequest::new("close me", ToastKind::Info));
        let mut changes = container.subscribe_changes();
        changes.borrow_and_update();

        assert!(container.dismiss(&record.id));
        assert!(container.is_empty());
        assert!(changes.has_changed().unwrap());
        changes.borrow_and_update();

        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;
        assert!(!changes.has_changed().unwrap(), "cancelled timer must not fire");

        assert!(!container.dismiss(&record.id));
    }

    #[tokio::test(start_paused = true)]
    async fn single_slot_keeps_only_latest() {
        let container = ToastContainer::new(ToastPolicy::single_slot());

        container.push(ToastRequest::new("first", ToastKind::Info));
        let second = container.push(ToastRequest::new("second", ToastKind::Info));

        let visible = container.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, second.id);
        assert_eq!(visible[0].duration_ms, 3_000);
    }

    #[tokio::test(start_paused = true)]
    async fn stacking_evicts_oldest_past_cap() {
        let container = ToastContainer::new(ToastPolicy::new(3, Duration::from_secs(5)));

        for n in 0..5 {
            container.push(ToastRequest::new(format!("toast {n}"), ToastKind::Info));
        }

        let messages: Vec<String> = container.visible().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, vec!["toast 2", "toast 3", "toast 4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn eviction_cancels_evicted_timer() {
        let container = ToastContainer::new(ToastPolicy::new(2, Duration::from_secs(60)));

        let evicted = container.push(
            ToastRequest::new("short", ToastKind::Info).with_duration(Duration::from_secs(1)),
        );
        container.push(ToastRequest::new("long a", ToastKind::Info));
        container.push(ToastRequest::new("long b", ToastKind::Info));
        assert!(container.get(&evicted.id).is_none());

        let mut changes = container.subscribe_changes();
        changes.borrow_and_update();

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert!(!changes.has_changed().unwrap(), "evicted timer must not fire");
        assert_eq!(container.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn same_timestamp_yields_distinct_ids() {
        let container = ToastContainer::new(ToastPolicy::default());
        let now = Utc::now();

        let mut a = ToastRequest::new("a", ToastKind::Info);
        let mut b = ToastRequest::new("b", ToastKind::Info);
        a.timestamp = now;
        b.timestamp = now;

        let first = container.push(a);
        let second = container.push(b);

        assert_eq!(first.timestamp, second.timestamp);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test(start_paused = true)]
    async fn request_duration_overrides_policy() {
        let container = ToastContainer::new(ToastPolicy::default());
        container.push(
            ToastRequest::new("short", ToastKind::Warning).with_duration(Duration::from_secs(1)),
        );
        container.push(ToastRequest::new("default", ToastKind::Info));

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        settle().await;

        let messages: Vec<String> = container.visible().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, vec!["default"]);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_cancels_every_timer() {
        let container = ToastContainer::new(ToastPolicy::default());
        container.push(ToastRequest::new("a", ToastKind::Info));
        container.push(ToastRequest::new("b", ToastKind::Info));

        container.clear();
        assert!(container.is_empty());

        let mut changes = container.subscribe_changes();
        changes.borrow_and_update();
        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;
        assert!(!changes.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn unmount_stops_delivery_and_clears() {
        let (dispatcher, mounted) = mount_with(ToastPolicy::default());
        let container = mounted.container().clone();

        dispatcher.info("before unmount");
        settle().await;
        assert_eq!(container.len(), 1);
        assert!(mounted.is_listening());

        mounted.unmount();
        assert!(container.is_empty());

        dispatcher.info("after unmount");
        settle().await;
        assert!(container.is_empty());
        assert_eq!(dispatcher.receiver_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn listener_stops_when_dispatcher_dropped() {
        let (dispatcher, mounted) = mount_with(ToastPolicy::default());
        drop(dispatcher);
        settle().await;
        assert!(!mounted.is_listening());
    }

    #[test]
    fn push_without_runtime_keeps_toast() {
        let container = ToastContainer::new(ToastPolicy::default());
        let record = container.push(ToastRequest::new("sticky", ToastKind::Info));

        assert_eq!(container.get(&record.id), Some(record.clone()));
        assert!(container.dismiss(&record.id));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_container_aborts_timers() {
        let container = ToastContainer::new(ToastPolicy::default());
        container.push(ToastRequest::new("orphan", ToastKind::Info));
        let weak = Arc::downgrade(&container.inner);

        drop(container);
        assert!(weak.upgrade().is_none(), "timers must not keep the list alive");

        // The aborted timer has nothing left to touch
        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;
        assert!(weak.upgrade().is_none());
    }
}
