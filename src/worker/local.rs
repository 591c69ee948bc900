//! # In-process worker runtime.
//!
//! [`LocalRuntime`] runs each worker context as a dedicated tokio task fed by an
//! unbounded queue. Entrypoints are [`TaskHandler`]s registered under a
//! [`CallbackHandle`].
//!
//! ## Architecture
//! ```text
//! LocalChannel::invoke(call) ──► [queue] ──► worker task ──► handler.on_*()
//!        ▲                                        │
//!        └──────────── oneshot ack ◄──────────────┘
//!
//! destroy(ctx) ──► cancel token ──► worker drops in-flight call, acks it Closed, exits
//! ```
//!
//! ## Rules
//! - Calls are handled sequentially (FIFO) per context.
//! - A handler error or panic rejects that call's ack; the worker keeps running.
//! - `destroy` never waits on the handler: cancellation aborts the in-flight call.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use futures::{FutureExt, future};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ChannelError, SupervisorError, TaskError};
use crate::model::CallbackHandle;
use crate::worker::{
    Ack, ChannelRef, CommandChannel, HandlerRef, TaskHandler, WorkerCall, WorkerContext, WorkerRuntime,
};

type AckSlot = oneshot::Sender<Result<Value, ChannelError>>;

/// One queued call, with an ack slot for `invoke`.
struct Envelope {
    call: WorkerCall,
    ack: Option<AckSlot>,
}

/// Bookkeeping for a live context.
struct LocalWorker {
    sender: mpsc::UnboundedSender<Envelope>,
    token: CancellationToken,
    join: JoinHandle<()>,
}

/// In-process [`WorkerRuntime`].
#[derive(Default)]
pub struct LocalRuntime {
    entrypoints: RwLock<HashMap<CallbackHandle, HandlerRef>>,
    workers: Mutex<HashMap<u64, LocalWorker>>,
    next_id: AtomicU64,
}

impl LocalRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` as the entrypoint for `handle`, returning the previous one.
    pub fn register(&self, handle: CallbackHandle, handler: HandlerRef) -> Option<HandlerRef> {
        self.entrypoints
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle, handler)
    }

    /// Removes the entrypoint for `handle`. Live contexts keep their handler.
    pub fn unregister(&self, handle: CallbackHandle) -> Option<HandlerRef> {
        self.entrypoints
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle)
    }

    /// Number of contexts created and not yet destroyed.
    pub fn live_contexts(&self) -> usize {
        self.workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn entrypoint(&self, handle: CallbackHandle) -> Option<HandlerRef> {
        self.entrypoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&handle)
            .cloned()
    }
}

#[async_trait]
impl WorkerRuntime for LocalRuntime {
    async fn create(&self, entrypoint: CallbackHandle) -> Result<WorkerContext, SupervisorError> {
        let handler = self
            .entrypoint(entrypoint)
            .ok_or_else(|| SupervisorError::EngineCreate {
                handle: entrypoint,
                reason: "no entrypoint registered".to_string(),
            })?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let join = tokio::spawn(worker_loop(handler, rx, token.clone()));

        self.workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                LocalWorker {
                    sender,
                    token,
                    join,
                },
            );
        debug!(context = id, %entrypoint, "local worker created");
        Ok(WorkerContext::new(id, entrypoint))
    }

    async fn bind_channel(&self, ctx: &WorkerContext) -> Result<ChannelRef, SupervisorError> {
        let workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        let worker = workers
            .get(&ctx.id())
            .ok_or_else(|| SupervisorError::ChannelBind {
                reason: format!("context {} is not alive", ctx.id()),
            })?;
        Ok(std::sync::Arc::new(LocalChannel {
            sender: worker.sender.clone(),
        }))
    }

    async fn destroy(&self, ctx: WorkerContext) {
        let worker = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&ctx.id());
        let Some(worker) = worker else {
            return;
        };

        worker.token.cancel();
        drop(worker.sender);
        if let Err(e) = worker.join.await {
            warn!(context = ctx.id(), error = %e, "local worker ended abnormally");
        }
        debug!(context = ctx.id(), "local worker destroyed");
    }
}

/// Channel end held by the supervisor.
struct LocalChannel {
    sender: mpsc::UnboundedSender<Envelope>,
}

impl CommandChannel for LocalChannel {
    fn invoke(&self, call: WorkerCall) -> Ack {
        let (ack, reply) = oneshot::channel();
        let queued = self.sender.send(Envelope {
            call,
            ack: Some(ack),
        });
        if queued.is_err() {
            return future::ready(Err(ChannelError::Closed)).boxed();
        }
        async move { reply.await.map_err(|_| ChannelError::Closed)? }.boxed()
    }

    fn send(&self, call: WorkerCall) -> Result<(), ChannelError> {
        self.sender
            .send(Envelope { call, ack: None })
            .map_err(|_| ChannelError::Closed)
    }
}

/// Processes calls until the queue closes or the context is cancelled.
async fn worker_loop(
    handler: HandlerRef,
    mut rx: mpsc::UnboundedReceiver<Envelope>,
    token: CancellationToken,
) {
    loop {
        let envelope = tokio::select! {
            _ = token.cancelled() => break,
            msg = rx.recv() => match msg {
                Some(envelope) => envelope,
                None => break,
            },
        };

        let Envelope { call, ack } = envelope;
        let method = call.method();
        let handled = AssertUnwindSafe(dispatch(handler.as_ref(), call)).catch_unwind();

        let outcome = tokio::select! {
            _ = token.cancelled() => {
                if let Some(ack) = ack {
                    let _ = ack.send(Err(ChannelError::Closed));
                }
                break;
            }
            outcome = handled => outcome,
        };

        let reply = match outcome {
            Ok(Ok(())) => Ok(Value::Null),
            Ok(Err(e)) => Err(ChannelError::Rejected {
                method,
                reason: e.to_string(),
            }),
            Err(_panic) => Err(ChannelError::Rejected {
                method,
                reason: "handler panicked".to_string(),
            }),
        };
        if let Err(ChannelError::Rejected { reason, .. }) = &reply {
            warn!(method, error = %reason, "task handler failed");
        }
        if let Some(ack) = ack {
            let _ = ack.send(reply);
        }
    }
}

/// Routes one call to the matching handler method.
async fn dispatch(handler: &dyn TaskHandler, call: WorkerCall) -> Result<(), TaskError> {
    match call {
        WorkerCall::Start { reason } => handler.on_start(reason).await,
        WorkerCall::RepeatEvent => handler.on_repeat_event().await,
        WorkerCall::Destroy => handler.on_destroy().await,
        WorkerCall::ReceiveData(data) => handler.on_receive_data(data).await,
        WorkerCall::NotificationButtonPressed(id) => {
            handler.on_notification_button_pressed(&id).await
        }
        WorkerCall::NotificationPressed => handler.on_notification_pressed().await,
        WorkerCall::NotificationDismissed => handler.on_notification_dismissed().await,
    }
}
