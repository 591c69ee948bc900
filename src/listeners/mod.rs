//! # Lifecycle listeners.
//!
//! This module provides the [`LifecycleListener`] trait and the ordered
//! [`ListenerRegistry`] the supervisor fans notifications out through.
//!
//! ## Architecture
//! ```text
//! TaskSupervisor ── notify(LifecycleEvent) ──► ListenerRegistry
//!                                                 │ (insertion order)
//!                                  ┌──────────────┼──────────────┐
//!                                  ▼              ▼              ▼
//!                             [queue L1]     [queue L2]     [queue LN]
//!                                  │              │              │
//!                              worker L1      worker L2      worker LN
//!                                  ▼              ▼              ▼
//!                           l1.on_engine_create() ...
//! ```
//!
//! ## Notifications
//! `on_engine_create`, `on_task_start(reason)`, `on_task_repeat_event`,
//! `on_task_destroy`, `on_engine_will_destroy`.

mod listener;
#[cfg(feature = "logging")]
mod log;
mod registry;

pub use listener::{LifecycleEvent, LifecycleListener, ListenerRef};
#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use registry::ListenerRegistry;
