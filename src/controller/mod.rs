//! # Controller: the service-level surface in front of the supervisor.
//!
//! [`ServiceHost`] implements the controller-facing command vocabulary and owns
//! the single [`TaskSupervisor`](crate::TaskSupervisor) of the process.
//! [`BootTrigger`] relaunches the service after OS-level events.
//!
//! ```text
//! ServiceCommand::parse(method, args) ─► ServiceHost::handle ─► ServiceReply
//!                                           │
//!   BootTrigger::handle(BootSignal) ──► ServiceLauncher (ServiceHost)
//!                                           │
//!                                           ├─► ConfigStore (ServiceStatus, TaskData, TaskOptions)
//!                                           ├─► TaskSupervisor (start / update / invoke / destroy)
//!                                           └─► Platform (permissions, minimize, wake up)
//! ```

mod boot;
mod command;
mod core;
mod platform;
mod shutdown;

pub use boot::{BootOutcome, BootPolicy, BootSignal, BootTrigger, ServiceLauncher, SuppressReason};
pub use command::{ServiceCommand, ServiceReply};
pub use core::ServiceHost;
pub use platform::{NoopPlatform, NotificationPermission, Platform};
pub use shutdown::wait_for_shutdown_signal;
