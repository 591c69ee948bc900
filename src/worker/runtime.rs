use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SupervisorError;
use crate::model::CallbackHandle;
use crate::worker::ChannelRef;

/// Opaque handle to a live worker context.
///
/// Not `Clone`: a context is released exactly once, by moving it into
/// [`WorkerRuntime::destroy`].
#[derive(Debug, PartialEq, Eq)]
pub struct WorkerContext {
    id: u64,
    entrypoint: CallbackHandle,
}

impl WorkerContext {
    /// Creates a handle; called by runtime adapters only.
    pub fn new(id: u64, entrypoint: CallbackHandle) -> Self {
        Self { id, entrypoint }
    }

    /// Runtime-assigned identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Entrypoint the context runs.
    pub fn entrypoint(&self) -> CallbackHandle {
        self.entrypoint
    }
}

/// # Isolated execution environment for user entrypoints.
///
/// `create` and `destroy` are atomic from the supervisor's point of view: a failed
/// `create` leaves nothing behind, and `destroy` must release the context even if
/// the worker is unresponsive.
#[async_trait]
pub trait WorkerRuntime: Send + Sync + 'static {
    /// Creates a context that runs `entrypoint`.
    async fn create(&self, entrypoint: CallbackHandle) -> Result<WorkerContext, SupervisorError>;

    /// Binds a command channel to `ctx`.
    async fn bind_channel(&self, ctx: &WorkerContext) -> Result<ChannelRef, SupervisorError>;

    /// Releases `ctx` (best effort, never fails).
    async fn destroy(&self, ctx: WorkerContext);
}

/// Shared handle to a runtime adapter.
pub type RuntimeRef = Arc<dyn WorkerRuntime>;
