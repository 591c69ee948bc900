//! File-backed configuration store.
//!
//! One JSON document per entity inside a state directory:
//! - `service_status.json`
//! - `task_data.json`
//! - `task_options.json`
//!
//! Writes go to a temp file in the same directory which is then persisted over
//! the target, so readers never observe a half-written document.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::StoreError;
use crate::model::{ServiceStatus, TaskData, TaskOptions};
use crate::store::ConfigStore;

const SERVICE_STATUS_FILE: &str = "service_status.json";
const TASK_DATA_FILE: &str = "task_data.json";
const TASK_OPTIONS_FILE: &str = "task_options.json";

/// [`ConfigStore`] persisting each entity as a JSON file.
pub struct JsonFileStore {
    state_dir: PathBuf,
    /// Serializes writers within this process.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Creates a store rooted at `state_dir`. The directory is created on first write.
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Directory holding the documents.
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    fn read<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T, StoreError> {
        let path = self.state_dir.join(file);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    fn write<T: Serialize>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        std::fs::create_dir_all(&self.state_dir)?;

        let content = serde_json::to_vec_pretty(value)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.state_dir)?;
        tmp.write_all(&content)?;
        let path = self.state_dir.join(file);
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!(path = %path.display(), "persisted store document");
        Ok(())
    }

    fn remove(&self, file: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        match std::fs::remove_file(self.state_dir.join(file)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl ConfigStore for JsonFileStore {
    fn service_status(&self) -> Result<ServiceStatus, StoreError> {
        self.read(SERVICE_STATUS_FILE)
    }

    fn set_service_status(&self, status: ServiceStatus) -> Result<(), StoreError> {
        self.write(SERVICE_STATUS_FILE, &status)
    }

    fn task_data(&self) -> Result<TaskData, StoreError> {
        self.read(TASK_DATA_FILE)
    }

    fn set_task_data(&self, data: TaskData) -> Result<(), StoreError> {
        self.write(TASK_DATA_FILE, &data)
    }

    fn clear_task_data(&self) -> Result<(), StoreError> {
        self.remove(TASK_DATA_FILE)
    }

    fn task_options(&self) -> Result<TaskOptions, StoreError> {
        self.read(TASK_OPTIONS_FILE)
    }

    fn set_task_options(&self, options: TaskOptions) -> Result<(), StoreError> {
        self.write(TASK_OPTIONS_FILE, &options)
    }

    fn clear_task_options(&self) -> Result<(), StoreError> {
        self.remove(TASK_OPTIONS_FILE)
    }
}
