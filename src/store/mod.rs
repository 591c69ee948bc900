//! # Persisted configuration store.
//!
//! [`ConfigStore`] is the synchronous key-value collaborator holding the
//! [`ServiceStatus`], [`TaskData`] and [`TaskOptions`] that survive a process
//! restart. Most recent write wins; the supervisor reads once per run.
//!
//! Implementations:
//! - [`MemoryStore`] in-process, for embedding and tests;
//! - [`JsonFileStore`] one JSON document per entity in a directory.

mod file;
mod memory;

use std::sync::Arc;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::model::{ServiceStatus, TaskData, TaskOptions};

/// Synchronous get/set/clear for persisted configuration.
///
/// Reads of never-written entities return the entity's `Default`.
pub trait ConfigStore: Send + Sync + 'static {
    fn service_status(&self) -> Result<ServiceStatus, StoreError>;
    fn set_service_status(&self, status: ServiceStatus) -> Result<(), StoreError>;

    fn task_data(&self) -> Result<TaskData, StoreError>;
    fn set_task_data(&self, data: TaskData) -> Result<(), StoreError>;
    fn clear_task_data(&self) -> Result<(), StoreError>;

    fn task_options(&self) -> Result<TaskOptions, StoreError>;
    fn set_task_options(&self, options: TaskOptions) -> Result<(), StoreError>;
    fn clear_task_options(&self) -> Result<(), StoreError>;
}

/// Shared reference to a store.
pub type StoreRef = Arc<dyn ConfigStore>;
