//! Runtime core: the supervisor actor and its repeat scheduler.
//!
//! The only public API from this module is [`TaskSupervisor`] (with its builder,
//! configuration and state).
//!
//! Internal modules:
//! - [`supervisor`]: actor owning the worker context, channel and schedule;
//! - [`scheduler`]: repeat timer driven by a [`TaskEventAction`](crate::TaskEventAction);
//! - [`builder`]: wires collaborators and spawns the actor;
//! - [`config`]: [`SupervisorConfig`].

mod builder;
mod config;
mod scheduler;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use supervisor::{SupervisorState, TaskSupervisor};
