//! Error types used by the workvisor runtime, its collaborators and task handlers.
//!
//! - [`SupervisorError`]: a start attempt could not create or wire the worker.
//! - [`ChannelError`]: the command channel could not deliver a call or its ack.
//! - [`StoreError`]: persisted configuration could not be read or written.
//! - [`HostError`]: outcome of a controller-facing call on [`ServiceHost`](crate::ServiceHost).
//! - [`TaskError`]: a user task handler failed to process a call.
//!
//! None of these ever escape a lifecycle transition: the supervisor logs them and
//! publishes them on the diagnostics bus. All provide `as_label` for logs/metrics.

use std::time::Duration;

use thiserror::Error;

use crate::model::CallbackHandle;

/// # Errors produced while bringing up a worker context.
///
/// Both variants are fatal to the current start attempt only; the supervisor
/// keeps no partial context and returns to `Idle`.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// The runtime failed to create a context for the entrypoint.
    #[error("failed to create worker context for entrypoint {handle}: {reason}")]
    EngineCreate {
        /// Entrypoint the context was created for.
        handle: CallbackHandle,
        /// Runtime-provided reason.
        reason: String,
    },

    /// The context was created but a command channel could not be bound to it.
    #[error("failed to bind command channel: {reason}")]
    ChannelBind {
        /// Runtime-provided reason.
        reason: String,
    },
}

impl SupervisorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use workvisor::{CallbackHandle, SupervisorError};
    ///
    /// let err = SupervisorError::EngineCreate { handle: CallbackHandle(7), reason: "boom".into() };
    /// assert_eq!(err.as_label(), "engine_create_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisorError::EngineCreate { .. } => "engine_create_failed",
            SupervisorError::ChannelBind { .. } => "channel_bind_failed",
        }
    }
}

/// # Errors produced by a [`CommandChannel`](crate::CommandChannel).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The channel was torn down (worker gone).
    #[error("command channel closed")]
    Closed,

    /// The channel is not bound yet or already unbound.
    #[error("command channel unavailable")]
    Unavailable,

    /// The worker received the call but reported a failure.
    #[error("worker rejected call '{method}': {reason}")]
    Rejected {
        /// Method name on the wire.
        method: &'static str,
        /// Worker-provided reason.
        reason: String,
    },

    /// No ack arrived in time.
    #[error("no ack after {timeout:?}")]
    Timeout {
        /// How long the caller waited.
        timeout: Duration,
    },
}

impl ChannelError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ChannelError::Closed => "channel_closed",
            ChannelError::Unavailable => "channel_unavailable",
            ChannelError::Rejected { .. } => "channel_rejected",
            ChannelError::Timeout { .. } => "channel_timeout",
        }
    }
}

/// # Errors produced by a [`ConfigStore`](crate::ConfigStore).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying file I/O failed.
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted document could not be (de)serialized.
    #[error("store document is malformed: {0}")]
    Serde(#[from] serde_json::Error),

    /// The store lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StoreError::Io(_) => "store_io",
            StoreError::Serde(_) => "store_serde",
            StoreError::Poisoned => "store_poisoned",
        }
    }
}

/// # Outcomes of controller-facing calls that did not succeed.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HostError {
    /// `startService` while a task is already running.
    #[error("service is already running")]
    AlreadyRunning,

    /// `updateService` / `stopService` / `restartService` / `sendData` with no running task.
    #[error("service is not running")]
    NotRunning,

    /// The command name is not part of the controller vocabulary.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// The command arguments could not be decoded.
    #[error("invalid arguments for '{method}': {reason}")]
    InvalidArguments {
        /// Command name.
        method: String,
        /// Decoder message.
        reason: String,
    },

    /// Persisting configuration failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HostError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HostError::AlreadyRunning => "service_already_running",
            HostError::NotRunning => "service_not_running",
            HostError::UnknownCommand(_) => "unknown_command",
            HostError::InvalidArguments { .. } => "invalid_arguments",
            HostError::Store(e) => e.as_label(),
        }
    }
}

/// # Errors produced by user task handlers.
///
/// Returned from [`TaskHandler`](crate::TaskHandler) callbacks; the worker reports
/// them back as a rejected ack.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Handler failed while processing a call.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Handler observed cancellation of its context.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use workvisor::TaskError;
    ///
    /// let err = TaskError::Fail { error: "boom".into() };
    /// assert_eq!(err.as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }
}
