//! # workvisor
//!
//! **Workvisor** supervises a single long-lived background task that runs inside
//! an isolated worker runtime.
//!
//! It creates and tears down the worker context, wires a typed command channel to
//! it, fires periodic "repeat" events, fans lifecycle notifications out to
//! listeners, and relaunches the task after OS-level events such as a reboot.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   controller commands               OS signals (boot, package replaced, alarm, terminate)
//!  (startService, updateService, ...)            │
//!            │                                   ▼
//!            ▼                           ┌───────────────┐
//! ┌──────────────────────┐   launch      │  BootTrigger  │
//! │     ServiceHost      │◄──────────────┤ (suppression) │
//! │ (writes ServiceStatus│               └───────┬───────┘
//! │  before transitions) │                       │ reads
//! └──────────┬───────────┘                       ▼
//!            │ start / update / invoke / destroy ┌───────────────┐
//!            ▼                                   │  ConfigStore  │
//! ┌──────────────────────────────────────┐ reads │ status, data, │
//! │ TaskSupervisor (actor, one op queue) ├──────►│    options    │
//! │  - RepeatScheduler (one timer)       │       └───────────────┘
//! │  - generation per worker context     │
//! └──┬──────────────┬─────────────────┬──┘
//!    │              │                 │ failures
//!    ▼              ▼                 ▼
//! WorkerRuntime  CommandChannel   Bus (diagnostics events)
//! create/destroy start, onRepeatEvent, onDestroy, ...
//!    │
//!    ▼
//! ListenerRegistry ──► per-listener queue ──► LifecycleListener::on_*()
//! ```
//!
//! ### Lifecycle
//! ```text
//! start(data, action)
//!   ├─ no callback handle ─► nothing happens
//!   ├─ runtime.create ─► bind_channel ─► onEngineCreate
//!   ├─ invoke start(reason) ─────────────► onTaskStart(reason)
//!   └─ ack ─► scheduler: Nothing | Once (one event now) | Repeat (every interval)
//!                  └─ tick ─► onRepeatEvent ─► onTaskRepeatEvent
//!
//! update(action)
//!   ├─ same callback handle ─► reschedule if the action changed
//!   └─ new callback handle  ─► teardown ─► start
//!
//! destroy()
//!   └─ stop timer ─► invoke onDestroy (bounded wait) ─► onTaskDestroy
//!                ─► onEngineWillDestroy ─► runtime.destroy(ctx)
//! ```
//!
//! ## Features
//! | Area            | Description                                                  | Key types / traits                         |
//! |-----------------|--------------------------------------------------------------|--------------------------------------------|
//! | **Supervision** | Drive one worker context through its lifecycle.              | [`TaskSupervisor`], [`SupervisorConfig`]   |
//! | **Workers**     | Runtime and channel capabilities, in-process adapter.        | [`WorkerRuntime`], [`CommandChannel`], [`LocalRuntime`] |
//! | **Listeners**   | Ordered, identity-unique lifecycle fan-out.                  | [`LifecycleListener`], [`ListenerRegistry`] |
//! | **Persistence** | Service status, task data and options.                       | [`ConfigStore`], [`MemoryStore`], [`JsonFileStore`] |
//! | **Controller**  | Service commands, boot relaunch, app termination.            | [`ServiceHost`], [`BootTrigger`]           |
//! | **Diagnostics** | Swallowed failures as broadcast events.                      | [`Event`], [`EventKind`]                   |
//! | **Errors**      | Typed errors for every collaborator.                         | [`SupervisorError`], [`ChannelError`], [`HostError`] |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use workvisor::{
//!     CallbackHandle, LocalRuntime, MemoryStore, RepeatFn, ServiceHost, SupervisorConfig,
//!     TaskData, TaskError, TaskEventAction, TaskOptions,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = Arc::new(LocalRuntime::new());
//!     runtime.register(
//!         CallbackHandle(42),
//!         RepeatFn::arc(|| async {
//!             println!("tick");
//!             Ok::<_, TaskError>(())
//!         }),
//!     );
//!
//!     let host = ServiceHost::new(SupervisorConfig::default(), runtime, Arc::new(MemoryStore::new()));
//!     host.start_service(
//!         TaskData::new(CallbackHandle(42)),
//!         TaskOptions::default().with_event_action(TaskEventAction::once()),
//!     )
//!     .await?;
//!
//!     host.stop_service().await?;
//!     Ok(())
//! }
//! ```

mod controller;
mod core;
mod error;
mod events;
mod listeners;
mod model;
mod store;
mod worker;

// ---- Public re-exports ----

pub use controller::{
    BootOutcome, BootPolicy, BootSignal, BootTrigger, NoopPlatform, NotificationPermission,
    Platform, ServiceCommand, ServiceHost, ServiceLauncher, ServiceReply, SuppressReason,
    wait_for_shutdown_signal,
};
pub use core::{SupervisorBuilder, SupervisorConfig, SupervisorState, TaskSupervisor};
pub use error::{ChannelError, HostError, StoreError, SupervisorError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use listeners::{LifecycleEvent, LifecycleListener, ListenerRef, ListenerRegistry};
pub use model::{
    CallbackHandle, ServiceAction, ServiceStatus, StarterReason, TaskData, TaskEventAction,
    TaskEventType, TaskOptions,
};
pub use store::{ConfigStore, JsonFileStore, MemoryStore, StoreRef};
pub use worker::{
    Ack, ChannelRef, CommandChannel, HandlerRef, LocalRuntime, RepeatFn, RuntimeRef, TaskHandler,
    WorkerCall, WorkerContext, WorkerRuntime,
};

// Optional: expose a simple built-in lifecycle logger (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use listeners::LogWriter;
