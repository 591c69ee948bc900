//! # Lifecycle listener trait.
//!
//! Each registered listener gets:
//! - **Dedicated worker task** (runs independently of the supervisor)
//! - **Per-listener FIFO queue** where lifecycle transitions are never dropped and
//!   the repeat-event backlog is bounded by [`LifecycleListener::queue_capacity`]
//! - **Panic isolation** (panics are reported as `EventKind::ListenerPanicked`)
//!
//! ## Ordering
//! Notifications reach each listener in the order the supervisor issued them:
//! `on_engine_create` precedes the first `on_task_start`, and `on_task_destroy`
//! precedes `on_engine_will_destroy` of the same teardown.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use workvisor::{LifecycleListener, StarterReason};
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl LifecycleListener for Audit {
//!     async fn on_task_start(&self, reason: StarterReason) {
//!         println!("task started by {reason:?}");
//!     }
//!
//!     fn name(&self) -> &'static str { "audit" }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::model::StarterReason;

/// One lifecycle notification, as queued for a listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    EngineCreate,
    TaskStart(StarterReason),
    TaskRepeatEvent,
    TaskDestroy,
    EngineWillDestroy,
}

/// Observer of the worker lifecycle. All methods default to no-ops.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Slow processing affects only this listener's queue.
#[async_trait]
pub trait LifecycleListener: Send + Sync + 'static {
    /// A worker context was created and its channel bound.
    async fn on_engine_create(&self) {}

    /// The `start` command was sent to the worker.
    async fn on_task_start(&self, _reason: StarterReason) {}

    /// A repeat event was dispatched.
    async fn on_task_repeat_event(&self) {}

    /// The worker was told to destroy its task.
    async fn on_task_destroy(&self) {}

    /// The worker context is about to be released.
    async fn on_engine_will_destroy(&self) {}

    /// Name used in logs and overflow/panic events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Maximum number of undelivered repeat events (clamped to at least 1). Default: 1024.
    ///
    /// Repeat events beyond it are dropped for this listener; transitions never are.
    fn queue_capacity(&self) -> usize {
        1024
    }
}

/// Shared reference to a listener.
pub type ListenerRef = Arc<dyn LifecycleListener>;

impl LifecycleEvent {
    /// Delivers this notification to `listener`.
    pub(crate) async fn deliver(self, listener: &dyn LifecycleListener) {
        match self {
            LifecycleEvent::EngineCreate => listener.on_engine_create().await,
            LifecycleEvent::TaskStart(reason) => listener.on_task_start(reason).await,
            LifecycleEvent::TaskRepeatEvent => listener.on_task_repeat_event().await,
            LifecycleEvent::TaskDestroy => listener.on_task_destroy().await,
            LifecycleEvent::EngineWillDestroy => listener.on_engine_will_destroy().await,
        }
    }
}
