//! # Function-backed handler (`RepeatFn`)
//!
//! [`RepeatFn`] wraps a closure `F: Fn() -> Fut`, producing a fresh future for
//! every repeat event. All other calls use the [`TaskHandler`] defaults.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use workvisor::{HandlerRef, RepeatFn, TaskError};
//!
//! let ticks = Arc::new(AtomicU64::new(0));
//! let counter = Arc::clone(&ticks);
//! let handler: HandlerRef = RepeatFn::arc(move || {
//!     let counter = Arc::clone(&counter);
//!     async move {
//!         counter.fetch_add(1, Ordering::Relaxed);
//!         Ok::<_, TaskError>(())
//!     }
//! });
//! # let _ = handler;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::worker::TaskHandler;

/// Handler that runs a closure on every repeat event.
#[derive(Debug)]
pub struct RepeatFn<F> {
    f: F,
}

impl<F> RepeatFn<F> {
    /// Creates a new function-backed handler.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> TaskHandler for RepeatFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    async fn on_repeat_event(&self) -> Result<(), TaskError> {
        (self.f)().await
    }
}
