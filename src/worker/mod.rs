//! # Worker runtime boundary.
//!
//! The supervisor never runs user code itself; it drives an isolated worker
//! through two capabilities:
//! - [`WorkerRuntime`] creates / destroys a [`WorkerContext`] and binds a channel to it;
//! - [`CommandChannel`] carries typed [`WorkerCall`]s to the worker, with or without ack.
//!
//! Platform adapters implement these two traits. [`LocalRuntime`] is the in-process
//! adapter: entrypoints are [`TaskHandler`]s registered under a [`CallbackHandle`](crate::CallbackHandle).

mod call;
mod channel;
mod handler;
mod handler_fn;
mod local;
mod runtime;

pub use call::WorkerCall;
pub use channel::{Ack, ChannelRef, CommandChannel};
pub use handler::{HandlerRef, TaskHandler};
pub use handler_fn::RepeatFn;
pub use local::LocalRuntime;
pub use runtime::{RuntimeRef, WorkerContext, WorkerRuntime};
