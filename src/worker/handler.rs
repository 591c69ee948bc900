//! # User task handler.
//!
//! A [`TaskHandler`] is the user logic an entrypoint runs inside a worker. Each
//! method corresponds to one [`WorkerCall`](crate::WorkerCall); only
//! [`on_repeat_event`](TaskHandler::on_repeat_event) is required.
//!
//! # Example
//! ```
//! use async_trait::async_trait;
//! use workvisor::{StarterReason, TaskError, TaskHandler};
//!
//! struct Heartbeat;
//!
//! #[async_trait]
//! impl TaskHandler for Heartbeat {
//!     async fn on_start(&self, reason: StarterReason) -> Result<(), TaskError> {
//!         println!("started by {reason:?}");
//!         Ok(())
//!     }
//!
//!     async fn on_repeat_event(&self) -> Result<(), TaskError> {
//!         // one iteration of periodic work
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TaskError;
use crate::model::StarterReason;

/// Periodic user logic executed inside a worker context.
///
/// Calls are delivered sequentially; a handler never sees two calls at once.
/// Returning an error rejects the call's ack but does not stop the worker.
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    /// The task was started by the supervisor.
    async fn on_start(&self, _reason: StarterReason) -> Result<(), TaskError> {
        Ok(())
    }

    /// One iteration of the periodic logic.
    async fn on_repeat_event(&self) -> Result<(), TaskError>;

    /// The task is about to be torn down.
    async fn on_destroy(&self) -> Result<(), TaskError> {
        Ok(())
    }

    /// Data sent by the controller via `sendData`.
    async fn on_receive_data(&self, _data: Value) -> Result<(), TaskError> {
        Ok(())
    }

    async fn on_notification_button_pressed(&self, _id: &str) -> Result<(), TaskError> {
        Ok(())
    }

    async fn on_notification_pressed(&self) -> Result<(), TaskError> {
        Ok(())
    }

    async fn on_notification_dismissed(&self) -> Result<(), TaskError> {
        Ok(())
    }
}

/// Shared reference to a handler.
pub type HandlerRef = Arc<dyn TaskHandler>;
