//! # TaskSupervisor: owns one worker context and drives its lifecycle.
//!
//! The [`TaskSupervisor`] is a cheap handle; all state lives in a single actor task
//! that processes operations one at a time, in the order they were issued.
//!
//! ## High-level architecture
//! ```text
//! handle.start / update / invoke / destroy
//!        │  (destroy also raises `destroy_requested` immediately)
//!        ▼
//!   [op queue] ──► actor (one serialization domain)
//!        ▲            │
//!        │            ├─ runtime.create(entrypoint) ─► bind_channel ─► notify EngineCreate
//!        │            ├─ invoke(start), ack awaited in a task ─────┐  notify TaskStart(reason)
//!        ├──── StartAcked{generation} ◄────────────────────────────┘
//!        │            ├─ scheduler.start(event_action)
//!        ├──── Tick{epoch} ◄── repeat timer
//!        │            ├─ channel.send(onRepeatEvent) ─► notify TaskRepeatEvent
//!        │            └─ teardown: stop timer ─► invoke(onDestroy) ≤ destroy_ack_timeout
//!        │                         ─► notify TaskDestroy ─► notify EngineWillDestroy
//!        │                         ─► runtime.destroy(ctx)
//!        ▼
//!   failures ──► Bus (diagnostics), never to the caller
//! ```
//!
//! ## Rules
//! - Operations never fail toward the caller; every failure is logged and published.
//! - Each worker context gets a fresh generation; acks and ticks of an older
//!   generation or timer are ignored.
//! - After `destroy` is requested no start ack, tick or new operation reaches the
//!   channel, and the actor exits once teardown completes.
//! - Dropping every handle without calling `destroy` tears the worker down the same way.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::builder::SupervisorBuilder;
use crate::core::config::SupervisorConfig;
use crate::core::scheduler::{RepeatScheduler, Scheduled};
use crate::error::ChannelError;
use crate::events::{Bus, Event, EventKind};
use crate::listeners::{LifecycleEvent, ListenerRef, ListenerRegistry};
use crate::model::{CallbackHandle, StarterReason, TaskData, TaskEventAction};
use crate::store::StoreRef;
use crate::worker::{ChannelRef, RuntimeRef, WorkerCall, WorkerContext};

/// Observable phase of a supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// No worker context exists.
    Idle,
    /// A worker context is being created and wired.
    Starting,
    /// A worker context is live.
    Running,
    /// The schedule or the entrypoint is being changed.
    Updating,
    /// Teardown in progress; the supervisor accepts no further work.
    Destroying,
    /// The actor has exited.
    Destroyed,
}

/// Work item of the actor queue.
enum Op {
    Start {
        data: TaskData,
        event_action: TaskEventAction,
    },
    Update {
        event_action: TaskEventAction,
    },
    Invoke {
        call: WorkerCall,
    },
    Destroy,
    StartAcked {
        generation: u64,
        result: Result<Value, ChannelError>,
    },
    Tick {
        epoch: u64,
    },
}

/// Handle to a supervisor actor. Cloning shares the same actor.
#[derive(Clone)]
pub struct TaskSupervisor {
    ops: mpsc::UnboundedSender<Op>,
    destroy_requested: Arc<AtomicBool>,
    state: watch::Receiver<SupervisorState>,
    finished: CancellationToken,
    listeners: Arc<ListenerRegistry>,
}

impl TaskSupervisor {
    /// Starts building a supervisor around `runtime`.
    pub fn builder(runtime: RuntimeRef) -> SupervisorBuilder {
        SupervisorBuilder::new(runtime)
    }

    /// Spawns the actor. Must be called within a Tokio runtime.
    pub(crate) fn spawn(
        cfg: SupervisorConfig,
        store: StoreRef,
        runtime: RuntimeRef,
        listeners: Arc<ListenerRegistry>,
    ) -> Self {
        let (ops, rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(SupervisorState::Idle);
        let destroy_requested = Arc::new(AtomicBool::new(false));
        let finished = CancellationToken::new();

        let actor = SupervisorActor {
            scheduler: RepeatScheduler::new(cfg.min_repeat_interval_clamped()),
            cfg,
            store,
            runtime,
            bus: listeners.bus().clone(),
            listeners: Arc::clone(&listeners),
            ops: ops.downgrade(),
            destroy_requested: Arc::clone(&destroy_requested),
            state: state_tx,
            destroyed: false,
            data: TaskData::empty(),
            event_action: TaskEventAction::nothing(),
            run: None,
            next_generation: 0,
        };
        let guard = finished.clone().drop_guard();
        tokio::spawn(async move {
            let _guard = guard;
            actor.run(rx).await;
        });

        Self {
            ops,
            destroy_requested,
            state,
            finished,
            listeners,
        }
    }

    /// Creates a worker context for `data.callback_handle` and starts it.
    ///
    /// With no callback handle this is a no-op. Ignored while a worker is already
    /// live or once `destroy` was requested.
    pub fn start(&self, data: TaskData, event_action: TaskEventAction) {
        self.post(Op::Start { data, event_action });
    }

    /// Applies a new schedule, re-reading the entrypoint from the store.
    ///
    /// An unchanged entrypoint keeps the worker and only reschedules; a changed one
    /// tears the worker down and starts a fresh one.
    pub fn update(&self, event_action: TaskEventAction) {
        self.post(Op::Update { event_action });
    }

    /// Forwards `call` to the worker without waiting for an ack.
    pub fn invoke(&self, call: WorkerCall) {
        self.post(Op::Invoke { call });
    }

    /// Tears the worker down. Idempotent; returns immediately.
    ///
    /// Operations issued before this call are still processed; anything issued after
    /// it is ignored. Use [`TaskSupervisor::stopped`] to wait for teardown.
    pub fn destroy(&self) {
        if self.destroy_requested.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.ops.send(Op::Destroy);
    }

    /// True once `destroy` was requested.
    pub fn is_destroyed(&self) -> bool {
        self.destroy_requested.load(Ordering::SeqCst)
    }

    /// Current phase.
    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    /// Receiver observing phase changes.
    pub fn state_changes(&self) -> watch::Receiver<SupervisorState> {
        self.state.clone()
    }

    /// Completes when the actor has exited (after `destroy` finished tearing down).
    pub async fn stopped(&self) {
        self.finished.cancelled().await;
    }

    /// Subscribes to diagnostics events.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.listeners.bus().subscribe()
    }

    /// Listener registry this supervisor notifies.
    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }

    /// Adds a lifecycle listener. Returns `false` if it was already registered.
    pub fn add_listener(&self, listener: ListenerRef) -> bool {
        self.listeners.add(listener)
    }

    /// Removes a lifecycle listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, listener: &ListenerRef) -> bool {
        self.listeners.remove(listener)
    }

    fn post(&self, op: Op) {
        if self.is_destroyed() {
            debug!("supervisor destroyed; operation ignored");
            return;
        }
        let _ = self.ops.send(op);
    }
}

/// The live worker context of the current generation.
struct Run {
    generation: u64,
    entrypoint: CallbackHandle,
    context: WorkerContext,
    channel: ChannelRef,
    acked: bool,
}

struct SupervisorActor {
    cfg: SupervisorConfig,
    store: StoreRef,
    runtime: RuntimeRef,
    bus: Bus,
    listeners: Arc<ListenerRegistry>,
    ops: mpsc::WeakUnboundedSender<Op>,
    destroy_requested: Arc<AtomicBool>,
    state: watch::Sender<SupervisorState>,
    scheduler: RepeatScheduler,

    destroyed: bool,
    data: TaskData,
    event_action: TaskEventAction,
    run: Option<Run>,
    next_generation: u64,
}

impl SupervisorActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Op>) {
        while let Some(op) = rx.recv().await {
            match op {
                Op::Start { data, event_action } => self.on_start(data, event_action).await,
                Op::Update { event_action } => self.on_update(event_action).await,
                Op::Invoke { call } => self.on_invoke(call),
                Op::StartAcked { generation, result } => self.on_start_acked(generation, result),
                Op::Tick { epoch } => self.on_tick(epoch),
                Op::Destroy => {
                    self.on_destroy().await;
                    break;
                }
            }
        }

        if !self.destroyed {
            debug!("all supervisor handles dropped; tearing down");
            self.on_destroy().await;
        }
        self.state.send_replace(SupervisorState::Destroyed);
    }

    fn stopping(&self) -> bool {
        self.destroyed || self.destroy_requested.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: SupervisorState) {
        self.state.send_replace(state);
    }

    async fn on_start(&mut self, data: TaskData, event_action: TaskEventAction) {
        if self.destroyed {
            return;
        }
        if let Some(run) = &self.run {
            debug!(generation = run.generation, "start ignored: worker already running");
            return;
        }

        self.data = data;
        self.event_action = event_action;
        let Some(handle) = data.callback_handle else {
            debug!("start ignored: no callback handle configured");
            return;
        };
        self.launch(handle).await;
    }

    async fn on_update(&mut self, event_action: TaskEventAction) {
        if self.destroyed {
            return;
        }
        let data = match self.store.task_data() {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "update ignored: task data unreadable");
                self.bus.publish(
                    Event::new(EventKind::StoreReadFailed).with_reason(e.to_string()),
                );
                return;
            }
        };
        let Some(handle) = data.callback_handle else {
            debug!("update ignored: no callback handle configured");
            return;
        };

        let same_entrypoint = self.run.as_ref().is_some_and(|r| r.entrypoint == handle);
        if same_entrypoint {
            let changed = self.event_action != event_action;
            self.data = data;
            self.event_action = event_action;
            if changed && self.run.as_ref().is_some_and(|r| r.acked) {
                self.set_state(SupervisorState::Updating);
                self.schedule();
                self.set_state(SupervisorState::Running);
            }
            return;
        }

        self.set_state(SupervisorState::Updating);
        if let Some(run) = self.run.take() {
            self.teardown(run).await;
        }
        if self.stopping() {
            debug!(entrypoint = %handle, "recreate abandoned: destroy requested during teardown");
            self.set_state(SupervisorState::Idle);
            return;
        }
        self.data = data;
        self.event_action = event_action;
        self.launch(handle).await;
    }

    fn on_invoke(&mut self, call: WorkerCall) {
        if self.destroyed {
            return;
        }
        let Some(run) = &self.run else {
            debug!(method = call.method(), "invoke ignored: no worker running");
            return;
        };
        let method = call.method();
        if let Err(e) = run.channel.send(call) {
            warn!(generation = run.generation, method, error = %e, "dispatch failed");
            self.bus.publish(
                Event::new(EventKind::DispatchFailed)
                    .with_generation(run.generation)
                    .with_method(method)
                    .with_reason(e.to_string()),
            );
        }
    }

    fn on_start_acked(&mut self, generation: u64, result: Result<Value, ChannelError>) {
        if self.stopping() {
            debug!(generation, "start ack after destroy ignored");
            return;
        }
        let Some(run) = self.run.as_mut().filter(|r| r.generation == generation) else {
            debug!(generation, "stale start ack ignored");
            return;
        };

        match result {
            Ok(_) => {
                run.acked = true;
                debug!(generation, "worker acknowledged start");
                self.schedule();
            }
            Err(e) => {
                warn!(generation, error = %e, "worker did not acknowledge start");
                self.bus.publish(
                    Event::new(EventKind::StartAckFailed)
                        .with_generation(generation)
                        .with_method(WorkerCall::START)
                        .with_reason(e.to_string()),
                );
            }
        }
    }

    fn on_tick(&mut self, epoch: u64) {
        if self.stopping() || !self.scheduler.is_current(epoch) {
            return;
        }
        self.dispatch_repeat();
    }

    async fn on_destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.destroy_requested.store(true, Ordering::SeqCst);
        self.set_state(SupervisorState::Destroying);

        self.scheduler.stop();
        // A run exists only once a context was created for a callback handle.
        // Without one there is no engine to announce the release of, so nothing
        // is notified; this keeps EngineCreate and EngineWillDestroy paired.
        if let Some(run) = self.run.take() {
            self.teardown(run).await;
        }
        info!("supervisor destroyed");
    }

    /// Creates, wires and starts a worker for `handle`.
    async fn launch(&mut self, handle: CallbackHandle) {
        if self.stopping() {
            return;
        }
        self.set_state(SupervisorState::Starting);

        let context = match self.runtime.create(handle).await {
            Ok(context) => context,
            Err(e) => {
                warn!(entrypoint = %handle, error = %e, "worker context creation failed");
                self.bus.publish(
                    Event::new(EventKind::EngineCreateFailed).with_reason(e.to_string()),
                );
                self.set_state(SupervisorState::Idle);
                return;
            }
        };

        let generation = self.next_generation;
        self.next_generation += 1;

        let channel = match self.runtime.bind_channel(&context).await {
            Ok(channel) => channel,
            Err(e) => {
                warn!(generation, error = %e, "command channel binding failed");
                self.bus.publish(
                    Event::new(EventKind::ChannelBindFailed)
                        .with_generation(generation)
                        .with_reason(e.to_string()),
                );
                self.runtime.destroy(context).await;
                self.set_state(SupervisorState::Idle);
                return;
            }
        };

        if self.stopping() {
            debug!(generation, "worker released before start: destroy requested");
            self.runtime.destroy(context).await;
            self.set_state(SupervisorState::Idle);
            return;
        }

        self.listeners.notify(LifecycleEvent::EngineCreate);
        let reason = self.starter_reason();
        self.spawn_start(generation, &channel, reason);
        self.listeners.notify(LifecycleEvent::TaskStart(reason));

        self.run = Some(Run {
            generation,
            entrypoint: handle,
            context,
            channel,
            acked: false,
        });
        self.set_state(SupervisorState::Running);
        info!(generation, entrypoint = %handle, ?reason, "worker started");
    }

    /// Enqueues `start` now; its ack is awaited off the actor and posted back.
    fn spawn_start(&self, generation: u64, channel: &ChannelRef, reason: StarterReason) {
        let ack = channel.invoke(WorkerCall::Start { reason });
        let ops = self.ops.clone();
        tokio::spawn(async move {
            let result = ack.await;
            if let Some(ops) = ops.upgrade() {
                let _ = ops.send(Op::StartAcked { generation, result });
            }
        });
    }

    fn starter_reason(&self) -> StarterReason {
        match self.store.service_status() {
            Ok(status) => status.starter_reason(),
            Err(e) => {
                warn!(error = %e, "service status unreadable; assuming system start");
                self.bus.publish(
                    Event::new(EventKind::StoreReadFailed).with_reason(e.to_string()),
                );
                StarterReason::System
            }
        }
    }

    /// (Re)starts the repeat schedule for the current run with `event_action`.
    fn schedule(&mut self) {
        let Some(generation) = self.run.as_ref().map(|r| r.generation) else {
            return;
        };
        let ops = self.ops.clone();
        let scheduled = self.scheduler.start(self.event_action, move |epoch| {
            ops.upgrade()
                .is_some_and(|ops| ops.send(Op::Tick { epoch }).is_ok())
        });

        match scheduled {
            Scheduled::Nothing => debug!(generation, "no repeat events scheduled"),
            Scheduled::Immediate => self.dispatch_repeat(),
            Scheduled::Timer { period } => {
                debug!(generation, period_ms = period.as_millis() as u64, "repeat timer started");
            }
        }
    }

    fn dispatch_repeat(&self) {
        let Some(run) = &self.run else {
            return;
        };
        match run.channel.send(WorkerCall::RepeatEvent) {
            Ok(()) => self.listeners.notify(LifecycleEvent::TaskRepeatEvent),
            Err(e) => {
                warn!(generation = run.generation, error = %e, "repeat event dispatch failed");
                self.bus.publish(
                    Event::new(EventKind::DispatchFailed)
                        .with_generation(run.generation)
                        .with_method(WorkerCall::REPEAT_EVENT)
                        .with_reason(e.to_string()),
                );
            }
        }
    }

    /// Stops the schedule, lets the worker clean up, then releases the context.
    async fn teardown(&mut self, run: Run) {
        self.scheduler.stop();
        let generation = run.generation;

        let ack = time::timeout(
            self.cfg.destroy_ack_timeout,
            run.channel.invoke(WorkerCall::Destroy),
        )
        .await;
        match ack {
            Ok(Ok(_)) => debug!(generation, "worker acknowledged destroy"),
            Ok(Err(e)) => {
                warn!(generation, error = %e, "worker destroy failed");
                self.bus.publish(
                    Event::new(EventKind::DestroyAckFailed)
                        .with_generation(generation)
                        .with_method(WorkerCall::DESTROY)
                        .with_reason(e.to_string()),
                );
            }
            Err(_) => {
                let timeout = self.cfg.destroy_ack_timeout;
                warn!(generation, ?timeout, "worker destroy timed out");
                self.bus.publish(
                    Event::new(EventKind::DestroyAckTimeout)
                        .with_generation(generation)
                        .with_method(WorkerCall::DESTROY)
                        .with_reason(ChannelError::Timeout { timeout }.to_string()),
                );
            }
        }
        self.listeners.notify(LifecycleEvent::TaskDestroy);

        self.listeners.notify(LifecycleEvent::EngineWillDestroy);
        self.runtime.destroy(run.context).await;
        info!(generation, "worker context released");
    }
}
