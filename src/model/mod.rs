//! # Persisted data model.
//!
//! Plain values shared by the supervisor, the stores and the controller:
//! - [`ServiceStatus`] / [`ServiceAction`] last action that triggered a run;
//! - [`StarterReason`] who triggered the current run (computed, never persisted);
//! - [`TaskData`] / [`CallbackHandle`] the user entrypoint to run;
//! - [`TaskEventAction`] / [`TaskEventType`] repeat scheduling policy;
//! - [`TaskOptions`] scheduling and auto-run configuration.
//!
//! ## Wire format
//! ```text
//! serviceStatus      {"action": "start" | "restart" | "update" | "stop" | "reboot" | "systemRestart" | "appTerminate" | null}
//! taskData           {"callbackHandle": <i64> | null}
//! taskOptions        {"eventAction": {"type": 1..3, "intervalMs": <u64>},
//!                     "autoRunOnBoot": <bool>, "autoRunOnMyPackageReplaced": <bool>}
//! ```

mod status;
mod task;

pub use status::{ServiceAction, ServiceStatus, StarterReason};
pub use task::{CallbackHandle, TaskData, TaskEventAction, TaskEventType, TaskOptions};
