use std::sync::Mutex;

use crate::error::StoreError;
use crate::model::{ServiceStatus, TaskData, TaskOptions};
use crate::store::ConfigStore;

#[derive(Default)]
struct Entries {
    status: ServiceStatus,
    data: TaskData,
    options: TaskOptions,
}

/// Mutex-guarded in-process [`ConfigStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Entries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Entries) -> T) -> Result<T, StoreError> {
        let mut guard = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&mut guard))
    }
}

impl ConfigStore for MemoryStore {
    fn service_status(&self) -> Result<ServiceStatus, StoreError> {
        self.with(|e| e.status)
    }

    fn set_service_status(&self, status: ServiceStatus) -> Result<(), StoreError> {
        self.with(|e| e.status = status)
    }

    fn task_data(&self) -> Result<TaskData, StoreError> {
        self.with(|e| e.data)
    }

    fn set_task_data(&self, data: TaskData) -> Result<(), StoreError> {
        self.with(|e| e.data = data)
    }

    fn clear_task_data(&self) -> Result<(), StoreError> {
        self.with(|e| e.data = TaskData::default())
    }

    fn task_options(&self) -> Result<TaskOptions, StoreError> {
        self.with(|e| e.options)
    }

    fn set_task_options(&self, options: TaskOptions) -> Result<(), StoreError> {
        self.with(|e| e.options = options)
    }

    fn clear_task_options(&self) -> Result<(), StoreError> {
        self.with(|e| e.options = TaskOptions::default())
    }
}
