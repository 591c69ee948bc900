use serde::{Deserialize, Serialize};

/// Action that triggered the most recent supervisor run.
///
/// Developer API calls write `Start`, `Restart`, `Update` or `Stop`.
/// System paths write `Reboot` (boot / package replaced), `SystemRestart`
/// (scheduled restart alarm) or `AppTerminate`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServiceAction {
    /// `startService` from the developer.
    Start,
    /// `restartService` from the developer.
    Restart,
    /// `updateService` from the developer.
    Update,
    /// `stopService` from the developer (deliberate stop).
    Stop,
    /// Device reboot or package replacement.
    Reboot,
    /// Scheduled restart alarm fired by the system.
    SystemRestart,
    /// Hosting application was terminated.
    AppTerminate,
}

/// Origin of a task run, handed to the worker in the `start` command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StarterReason {
    /// Explicit developer API call.
    Developer,
    /// OS event (reboot, restart alarm, ...) or unknown origin.
    System,
}

impl StarterReason {
    /// Integer sent to the worker (`start(starterReason: int)`).
    pub fn as_code(self) -> i64 {
        match self {
            StarterReason::Developer => 0,
            StarterReason::System => 1,
        }
    }
}

/// Persisted service status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    /// Last action; `None` when never written.
    pub action: Option<ServiceAction>,
}

impl ServiceStatus {
    pub fn new(action: ServiceAction) -> Self {
        Self {
            action: Some(action),
        }
    }

    /// `Developer` for `Start`/`Restart`/`Update`, `System` otherwise (including unset).
    pub fn starter_reason(&self) -> StarterReason {
        match self.action {
            Some(ServiceAction::Start | ServiceAction::Restart | ServiceAction::Update) => {
                StarterReason::Developer
            }
            _ => StarterReason::System,
        }
    }

    /// True when the developer deliberately stopped the service.
    pub fn is_correctly_stopped(&self) -> bool {
        self.action == Some(ServiceAction::Stop)
    }
}
