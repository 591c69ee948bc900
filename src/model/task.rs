use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Opaque reference to a user entrypoint registered with the worker runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackHandle(pub i64);

impl fmt::Display for CallbackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifies what the worker runs. `callback_handle = None` means "nothing to run".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskData {
    pub callback_handle: Option<CallbackHandle>,
}

impl TaskData {
    pub fn new(handle: CallbackHandle) -> Self {
        Self {
            callback_handle: Some(handle),
        }
    }

    /// Task data with no entrypoint.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// How repeat events are produced.
///
/// Serialized as an integer: `1` = Nothing, `2` = Once, `3` = Repeat.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TaskEventType {
    /// No repeat events.
    #[default]
    Nothing,
    /// One repeat event right after the task starts.
    Once,
    /// A repeat event every `interval_ms`.
    Repeat,
}

impl TryFrom<u8> for TaskEventType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TaskEventType::Nothing),
            2 => Ok(TaskEventType::Once),
            3 => Ok(TaskEventType::Repeat),
            other => Err(format!("unknown task event type {other} (expected 1..=3)")),
        }
    }
}

impl From<TaskEventType> for u8 {
    fn from(value: TaskEventType) -> Self {
        match value {
            TaskEventType::Nothing => 1,
            TaskEventType::Once => 2,
            TaskEventType::Repeat => 3,
        }
    }
}

/// Scheduling policy for repeat events. Equality is by `(kind, interval_ms)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEventAction {
    #[serde(rename = "type")]
    pub kind: TaskEventType,
    #[serde(default)]
    pub interval_ms: u64,
}

impl TaskEventAction {
    pub fn nothing() -> Self {
        Self {
            kind: TaskEventType::Nothing,
            interval_ms: 0,
        }
    }

    pub fn once() -> Self {
        Self {
            kind: TaskEventType::Once,
            interval_ms: 0,
        }
    }

    pub fn repeat(interval_ms: u64) -> Self {
        Self {
            kind: TaskEventType::Repeat,
            interval_ms,
        }
    }

    /// Repeat interval as a [`Duration`].
    #[inline]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Persisted scheduling and auto-run configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskOptions {
    pub event_action: TaskEventAction,
    /// Relaunch after device boot.
    pub auto_run_on_boot: bool,
    /// Relaunch after the hosting package is replaced.
    pub auto_run_on_my_package_replaced: bool,
}

impl TaskOptions {
    pub fn with_event_action(mut self, event_action: TaskEventAction) -> Self {
        self.event_action = event_action;
        self
    }

    pub fn with_auto_run_on_boot(mut self, enabled: bool) -> Self {
        self.auto_run_on_boot = enabled;
        self
    }

    pub fn with_auto_run_on_my_package_replaced(mut self, enabled: bool) -> Self {
        self.auto_run_on_my_package_replaced = enabled;
        self
    }
}
