//! # LogWriter: lifecycle printer
//!
//! A minimal listener that reports every lifecycle notification through `tracing`.
//! Use it for demos and debugging.
//!
//! ## Example output
//! ```text
//! INFO workvisor: [engine-create]
//! INFO workvisor: [task-start] reason=Developer
//! INFO workvisor: [repeat-event]
//! INFO workvisor: [task-destroy]
//! INFO workvisor: [engine-will-destroy]
//! ```

use async_trait::async_trait;
use tracing::info;

use crate::listeners::LifecycleListener;
use crate::model::StarterReason;

/// Lifecycle writer listener.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LifecycleListener for LogWriter {
    async fn on_engine_create(&self) {
        info!(target: "workvisor", "[engine-create]");
    }

    async fn on_task_start(&self, reason: StarterReason) {
        info!(target: "workvisor", ?reason, "[task-start]");
    }

    async fn on_task_repeat_event(&self) {
        info!(target: "workvisor", "[repeat-event]");
    }

    async fn on_task_destroy(&self) {
        info!(target: "workvisor", "[task-destroy]");
    }

    async fn on_engine_will_destroy(&self) {
        info!(target: "workvisor", "[engine-will-destroy]");
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
