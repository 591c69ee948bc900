//! # Diagnostics event record.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use workvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::DestroyAckFailed)
//!     .with_generation(3)
//!     .with_method("onDestroy")
//!     .with_reason("channel closed");
//!
//! assert_eq!(ev.kind, EventKind::DestroyAckFailed);
//! assert_eq!(ev.generation, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of diagnostics events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Start path ===
    /// The runtime could not create a worker context; the start attempt was aborted.
    ///
    /// Sets: `reason`
    EngineCreateFailed,

    /// A context was created but no channel could be bound; the context was released.
    ///
    /// Sets: `generation`, `reason`
    ChannelBindFailed,

    /// The worker did not acknowledge `start`; the repeat scheduler never began.
    ///
    /// Sets: `generation`, `method`, `reason`
    StartAckFailed,

    // === Steady state ===
    /// A call could not be handed to the channel (closed / unavailable).
    ///
    /// Sets: `generation`, `method`, `reason`
    DispatchFailed,

    // === Teardown ===
    /// The worker answered `onDestroy` with an error; teardown continued.
    ///
    /// Sets: `generation`, `method`, `reason`
    DestroyAckFailed,

    /// The worker did not answer `onDestroy` in time; teardown continued.
    ///
    /// Sets: `generation`, `method`, `reason`
    DestroyAckTimeout,

    // === Listener fan-out ===
    /// A listener queue was full or closed; the notification was dropped for it only.
    ///
    /// Sets: `source` (listener name), `reason`
    ListenerOverflow,

    /// A listener panicked while handling a notification.
    ///
    /// Sets: `source` (listener name), `reason`
    ListenerPanicked,

    // === Configuration ===
    /// Persisted configuration could not be read; defaults were used instead.
    ///
    /// Sets: `reason`
    StoreReadFailed,
}

/// Diagnostics event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Worker context generation the event relates to.
    pub generation: Option<u64>,
    /// Worker-facing method name on the wire.
    pub method: Option<&'static str>,
    /// Listener name (fan-out events).
    pub source: Option<&'static str>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            generation: None,
            method: None,
            source: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    #[inline]
    pub fn with_method(mut self, method: &'static str) -> Self {
        self.method = Some(method);
        self
    }

    #[inline]
    pub fn with_source(mut self, source: &'static str) -> Self {
        self.source = Some(source);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a listener overflow event.
    #[inline]
    pub fn listener_overflow(listener: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::ListenerOverflow)
            .with_source(listener)
            .with_reason(reason)
    }

    /// Creates a listener panic event.
    #[inline]
    pub fn listener_panicked(listener: &'static str, info: String) -> Self {
        Event::new(EventKind::ListenerPanicked)
            .with_source(listener)
            .with_reason(info)
    }
}
