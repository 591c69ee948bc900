#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{FutureExt, future};
use serde_json::Value;
use tokio::sync::oneshot;
use workvisor::{
    Ack, CallbackHandle, ChannelError, ChannelRef, CommandChannel, LifecycleEvent, LifecycleListener,
    StarterReason, SupervisorError, WorkerCall, WorkerContext, WorkerRuntime,
};

/// How a fake channel answers `onDestroy`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DestroyMode {
    Ack,
    Fail,
    Hang,
}

/// Channel recording every call it carries.
pub struct FakeChannel {
    calls: Mutex<Vec<WorkerCall>>,
    start_gate: Mutex<Option<oneshot::Receiver<()>>>,
    destroy_mode: DestroyMode,
    closed: AtomicBool,
}

impl FakeChannel {
    fn new(start_gate: Option<oneshot::Receiver<()>>, destroy_mode: DestroyMode) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            start_gate: Mutex::new(start_gate),
            destroy_mode,
            closed: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> Vec<WorkerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method() == method)
            .count()
    }

    /// Makes every later call fail with `Closed`, as if the worker vanished.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn reopen(&self) {
        self.closed.store(false, Ordering::SeqCst);
    }

    fn record(&self, call: &WorkerCall) -> Result<(), ChannelError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ChannelError::Closed);
        }
        self.calls.lock().unwrap().push(call.clone());
        Ok(())
    }
}

impl CommandChannel for FakeChannel {
    fn invoke(&self, call: WorkerCall) -> Ack {
        if let Err(e) = self.record(&call) {
            return future::ready(Err(e)).boxed();
        }
        match call {
            WorkerCall::Start { .. } => {
                let gate = self.start_gate.lock().unwrap().take();
                async move {
                    if let Some(gate) = gate {
                        let _ = gate.await;
                    }
                    Ok(Value::Null)
                }
                .boxed()
            }
            WorkerCall::Destroy => match self.destroy_mode {
                DestroyMode::Ack => future::ready(Ok(Value::Null)).boxed(),
                DestroyMode::Fail => future::ready(Err(ChannelError::Rejected {
                    method: WorkerCall::DESTROY,
                    reason: "cleanup failed".into(),
                }))
                .boxed(),
                DestroyMode::Hang => future::pending().boxed(),
            },
            _ => future::ready(Ok(Value::Null)).boxed(),
        }
    }

    fn send(&self, call: WorkerCall) -> Result<(), ChannelError> {
        self.record(&call)
    }
}

/// Runtime handing out [`FakeChannel`]s; context ids index `channels()`.
pub struct FakeRuntime {
    next_id: AtomicU64,
    created: Mutex<Vec<CallbackHandle>>,
    destroyed: Mutex<Vec<u64>>,
    channels: Mutex<Vec<Arc<FakeChannel>>>,
    fail_create: AtomicBool,
    fail_bind: AtomicBool,
    start_gate: Mutex<Option<oneshot::Receiver<()>>>,
    destroy_mode: Mutex<DestroyMode>,
}

impl FakeRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(0),
            created: Mutex::new(Vec::new()),
            destroyed: Mutex::new(Vec::new()),
            channels: Mutex::new(Vec::new()),
            fail_create: AtomicBool::new(false),
            fail_bind: AtomicBool::new(false),
            start_gate: Mutex::new(None),
            destroy_mode: Mutex::new(DestroyMode::Ack),
        })
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_bind(&self, fail: bool) {
        self.fail_bind.store(fail, Ordering::SeqCst);
    }

    /// The next channel holds its `start` ack until the returned sender fires (or drops).
    pub fn hold_next_start(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.start_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn set_destroy_mode(&self, mode: DestroyMode) {
        *self.destroy_mode.lock().unwrap() = mode;
    }

    pub fn created(&self) -> Vec<CallbackHandle> {
        self.created.lock().unwrap().clone()
    }

    pub fn destroyed(&self) -> Vec<u64> {
        self.destroyed.lock().unwrap().clone()
    }

    pub fn channels(&self) -> Vec<Arc<FakeChannel>> {
        self.channels.lock().unwrap().clone()
    }

    pub fn channel(&self, idx: usize) -> Arc<FakeChannel> {
        Arc::clone(&self.channels.lock().unwrap()[idx])
    }

    /// Calls of `method` across every channel ever bound.
    pub fn count(&self, method: &str) -> usize {
        self.channels().iter().map(|c| c.count(method)).sum()
    }
}

#[async_trait]
impl WorkerRuntime for FakeRuntime {
    async fn create(&self, entrypoint: CallbackHandle) -> Result<WorkerContext, SupervisorError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(SupervisorError::EngineCreate {
                handle: entrypoint,
                reason: "engine refused".into(),
            });
        }
        self.created.lock().unwrap().push(entrypoint);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(WorkerContext::new(id, entrypoint))
    }

    async fn bind_channel(&self, _ctx: &WorkerContext) -> Result<ChannelRef, SupervisorError> {
        if self.fail_bind.load(Ordering::SeqCst) {
            return Err(SupervisorError::ChannelBind {
                reason: "no messenger".into(),
            });
        }
        let gate = self.start_gate.lock().unwrap().take();
        let mode = *self.destroy_mode.lock().unwrap();
        let channel = Arc::new(FakeChannel::new(gate, mode));
        self.channels.lock().unwrap().push(Arc::clone(&channel));
        Ok(channel)
    }

    async fn destroy(&self, ctx: WorkerContext) {
        if let Some(channel) = self.channels.lock().unwrap().get(ctx.id() as usize) {
            channel.close();
        }
        self.destroyed.lock().unwrap().push(ctx.id());
    }
}

/// Listener recording every notification in arrival order.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, ev: LifecycleEvent) -> usize {
        self.events.lock().unwrap().iter().filter(|e| **e == ev).count()
    }

    /// Notifications other than repeat events.
    pub fn transitions(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .copied()
            .filter(|e| *e != LifecycleEvent::TaskRepeatEvent)
            .collect()
    }

    fn push(&self, ev: LifecycleEvent) {
        self.events.lock().unwrap().push(ev);
    }
}

#[async_trait]
impl LifecycleListener for Recorder {
    async fn on_engine_create(&self) {
        self.push(LifecycleEvent::EngineCreate);
    }

    async fn on_task_start(&self, reason: StarterReason) {
        self.push(LifecycleEvent::TaskStart(reason));
    }

    async fn on_task_repeat_event(&self) {
        self.push(LifecycleEvent::TaskRepeatEvent);
    }

    async fn on_task_destroy(&self) {
        self.push(LifecycleEvent::TaskDestroy);
    }

    async fn on_engine_will_destroy(&self) {
        self.push(LifecycleEvent::EngineWillDestroy);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

/// Lets every queued operation, ack and listener delivery run (virtual time).
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
