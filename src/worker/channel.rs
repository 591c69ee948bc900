//! # Command channel capability.
//!
//! A [`CommandChannel`] is bound to exactly one [`WorkerContext`](crate::WorkerContext)
//! and dies with it. Two call styles:
//! - [`invoke`](CommandChannel::invoke) request/ack, the returned [`Ack`] resolves when the worker answers;
//! - [`send`](CommandChannel::send) fire-and-forget, fails only if the link is gone.
//!
//! Both enqueue the call before returning, so a `send` issued after an `invoke`
//! reaches the worker after it even while the ack is still outstanding.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::ChannelError;
use crate::worker::WorkerCall;

/// Pending worker answer to an [`invoke`](CommandChannel::invoke).
pub type Ack = BoxFuture<'static, Result<Value, ChannelError>>;

/// Bidirectional asynchronous link to a worker.
///
/// ### Implementation requirements
/// - Calls are delivered to the worker in the order they were issued.
/// - An [`Ack`] must resolve (with an error) once the worker is gone; the supervisor
///   additionally bounds the `onDestroy` wait with a timeout.
pub trait CommandChannel: Send + Sync + 'static {
    /// Enqueues `call` and returns its ack.
    fn invoke(&self, call: WorkerCall) -> Ack;

    /// Enqueues `call` without an ack.
    fn send(&self, call: WorkerCall) -> Result<(), ChannelError>;
}

/// Shared handle to a bound channel.
pub type ChannelRef = Arc<dyn CommandChannel>;
