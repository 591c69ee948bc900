//! # Broadcast bus for diagnostics events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]:
//! ```text
//! Publishers:                         Receivers (any number):
//!   supervisor actor  ──┐
//!   ack / teardown    ──┼──► Bus ───►  TaskSupervisor::events()
//!   listener workers  ──┘             (one independent receiver each)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks and never fails.
//! - **Bounded capacity**: slow receivers get `RecvError::Lagged(n)`.
//! - **No persistence**: events published with no receiver are dropped.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for diagnostics events.
///
/// Cheap to clone (holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus; capacity is clamped to a minimum of 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all current receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
