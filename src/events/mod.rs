//! # Diagnostics events (the supervisor's error sink).
//!
//! Every failure the supervisor swallows, instead of propagating, is published
//! here so that embedders can observe it without the lifecycle ever failing:
//! - [`Bus`] thin broadcast channel shared by the supervisor and listener workers;
//! - [`Event`] / [`EventKind`] what went wrong, with a global sequence number.
//!
//! Lifecycle notifications themselves are not events; they go through
//! [`LifecycleListener`](crate::LifecycleListener).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
