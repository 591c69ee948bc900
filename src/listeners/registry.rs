//! # Ordered, identity-unique listener fan-out.
//!
//! Provides [`ListenerRegistry`], an insertion-ordered set of listeners that
//! distributes lifecycle notifications without blocking the supervisor.
//!
//! ## Rules
//! - **Identity**: a listener is identified by its `Arc` allocation; adding the same
//!   `Arc` twice is a no-op.
//! - **Per-listener FIFO**: each listener sees notifications in issue order.
//! - **Non-blocking**: `notify()` never waits on a listener.
//! - **Transitions are never dropped**: `EngineCreate`, `TaskStart`, `TaskDestroy`
//!   and `EngineWillDestroy` always reach every registered listener.
//! - **Repeat backlog is bounded**: once a listener has `queue_capacity()` repeat
//!   events pending, further repeat events are dropped for that listener only and
//!   `ListenerOverflow` is published on the bus.
//! - **Panic isolation**: a panicking listener is reported as `ListenerPanicked`
//!   and keeps receiving subsequent notifications.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a listener panics while holding a lock.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::debug;

use crate::events::{Bus, Event};
use crate::listeners::{LifecycleEvent, ListenerRef};

/// Registered listener with its queue and worker.
struct Entry {
    listener: ListenerRef,
    name: &'static str,
    sender: mpsc::UnboundedSender<LifecycleEvent>,
    pending_repeats: Arc<AtomicUsize>,
    repeat_capacity: usize,
    worker: JoinHandle<()>,
}

/// Fan-out coordinator for lifecycle listeners.
///
/// Shared (`Arc`) between the controller and every supervisor it creates, so
/// listeners survive worker recreation.
pub struct ListenerRegistry {
    entries: RwLock<Vec<Entry>>,
    bus: Bus,
}

impl ListenerRegistry {
    /// Creates an empty registry that reports overflow/panics on `bus`.
    pub fn new(bus: Bus) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            bus,
        }
    }

    /// Diagnostics bus shared with the supervisor.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Adds `listener` at the end of the set. Returns `false` if it was already present.
    ///
    /// Spawns the listener's worker; must be called within a Tokio runtime.
    pub fn add(&self, listener: ListenerRef) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.iter().any(|e| same_listener(&e.listener, &listener)) {
            return false;
        }

        let name = listener.name();
        let repeat_capacity = listener.queue_capacity().max(1);
        let (sender, mut rx) = mpsc::unbounded_channel::<LifecycleEvent>();
        let pending_repeats = Arc::new(AtomicUsize::new(0));
        let pending = Arc::clone(&pending_repeats);
        let l = Arc::clone(&listener);
        let bus = self.bus.clone();

        let worker = tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                if ev == LifecycleEvent::TaskRepeatEvent {
                    pending.fetch_sub(1, Ordering::AcqRel);
                }
                let fut = ev.deliver(l.as_ref());
                if let Err(panic_err) = AssertUnwindSafe(fut).catch_unwind().await {
                    let info = if let Some(msg) = panic_err.downcast_ref::<&'static str>() {
                        (*msg).to_string()
                    } else if let Some(msg) = panic_err.downcast_ref::<String>() {
                        msg.clone()
                    } else {
                        "unknown panic".to_string()
                    };
                    bus.publish(Event::listener_panicked(l.name(), info));
                }
            }
        });

        debug!(listener = name, "lifecycle listener added");
        entries.push(Entry {
            listener,
            name,
            sender,
            pending_repeats,
            repeat_capacity,
            worker,
        });
        true
    }

    /// Removes `listener`. Notifications already queued for it are still delivered.
    pub fn remove(&self, listener: &ListenerRef) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.iter().position(|e| same_listener(&e.listener, listener)) {
            Some(idx) => {
                let entry = entries.remove(idx);
                debug!(listener = entry.name, "lifecycle listener removed");
                true
            }
            None => false,
        }
    }

    /// Returns true if `listener` is registered.
    pub fn contains(&self, listener: &ListenerRef) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|e| same_listener(&e.listener, listener))
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queues `ev` for every listener, in insertion order.
    pub(crate) fn notify(&self, ev: LifecycleEvent) {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        for entry in entries.iter() {
            if ev == LifecycleEvent::TaskRepeatEvent && !entry.reserve_repeat() {
                self.bus.publish(Event::listener_overflow(entry.name, "full"));
                continue;
            }
            if entry.sender.send(ev).is_err() {
                if ev == LifecycleEvent::TaskRepeatEvent {
                    entry.pending_repeats.fetch_sub(1, Ordering::AcqRel);
                }
                self.bus
                    .publish(Event::listener_overflow(entry.name, "closed"));
            }
        }
    }

    /// Closes every queue and waits for the workers to drain.
    pub async fn shutdown(&self) {
        let entries: Vec<Entry> = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries.drain(..).collect()
        };
        for entry in entries {
            drop(entry.sender);
            let _ = entry.worker.await;
        }
    }
}

impl Entry {
    /// Claims a slot in the repeat backlog; false when the backlog is full.
    fn reserve_repeat(&self) -> bool {
        self.pending_repeats
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.repeat_capacity).then_some(n + 1)
            })
            .is_ok()
    }
}

/// Identity comparison on the allocation, ignoring vtable pointers.
fn same_listener(a: &ListenerRef, b: &ListenerRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
