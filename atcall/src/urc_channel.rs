use std::sync::Arc;
use core::{
    cell::RefCell,
    sync::atomic::{AtomicU64, Ordering},
};
use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use embassy_time::Instant;
use log::{debug, error};
use std::panic::{catch_unwind, AssertUnwindSafe};

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

/// Handle returned by every `subscribe`/`on_*` call, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        Self(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed))
    }
}

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// An append-only list of event handlers.
///
/// Handlers run synchronously on the read loop, in subscription order. The
/// list is copied before handlers run, so a handler may subscribe or
/// unsubscribe (itself included) without deadlocking; the change applies
/// from the next event on. A panicking handler is logged and skipped.
pub struct Observers<E> {
    handlers: Mutex<CriticalSectionRawMutex, RefCell<Vec<(SubscriptionId, Handler<E>)>>>,
}

impl<E> Observers<E> {
    pub const fn new() -> Self {
        Self {
            handlers: Mutex::new(RefCell::new(Vec::new())),
        }
    }

    pub fn subscribe(&self, handler: impl Fn(&E) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.handlers
            .lock(|h| h.borrow_mut().push((id, Arc::new(handler))));
        id
    }

    /// Returns `false` if `id` is not subscribed to this list.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.handlers.lock(|h| {
            let mut h = h.borrow_mut();
            let before = h.len();
            h.retain(|(sub, _)| *sub != id);
            h.len() != before
        })
    }

    pub fn len(&self) -> usize {
        self.handlers.lock(|h| h.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every handler. Returns the number of handlers run.
    pub(crate) fn publish(&self, event: &E) -> usize {
        let handlers: Vec<Handler<E>> = self
            .handlers
            .lock(|h| h.borrow().iter().map(|(_, f)| f.clone()).collect());

        for handler in &handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                error!("Event handler panicked");
            }
        }
        handlers.len()
    }
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A line received outside of any command response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    line: String,
    received_at: Instant,
}

impl Notification {
    pub fn new(line: impl Into<String>, received_at: Instant) -> Self {
        Self {
            line: line.into(),
            received_at,
        }
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn received_at(&self) -> Instant {
        self.received_at
    }
}

/// Publishes unsolicited lines to their subscribers.
#[derive(Default)]
pub struct UrcChannel {
    subscribers: Observers<Notification>,
}

impl UrcChannel {
    pub const fn new() -> Self {
        Self {
            subscribers: Observers::new(),
        }
    }

    pub fn subscribe(
        &self,
        handler: impl Fn(&Notification) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.subscribers.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    pub(crate) fn publish(&self, notification: &Notification) {
        let delivered = self.subscribers.publish(notification);
        debug!(
            "Received URC: {:?} ({} subscriber(s))",
            notification.line(),
            delivered
        );
    }
}
