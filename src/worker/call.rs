use serde_json::Value;

use crate::model::StarterReason;

/// Worker-facing command vocabulary.
///
/// | variant                      | wire method                    | arguments        |
/// |------------------------------|--------------------------------|------------------|
/// | `Start`                      | `start`                        | starter reason   |
/// | `RepeatEvent`                | `onRepeatEvent`                | none             |
/// | `Destroy`                    | `onDestroy`                    | none             |
/// | `ReceiveData`                | `onReceiveData`                | payload          |
/// | `NotificationButtonPressed`  | `onNotificationButtonPressed`  | button id        |
/// | `NotificationPressed`        | `onNotificationPressed`        | none             |
/// | `NotificationDismissed`      | `onNotificationDismissed`      | none             |
#[derive(Clone, Debug, PartialEq)]
pub enum WorkerCall {
    Start { reason: StarterReason },
    RepeatEvent,
    Destroy,
    ReceiveData(Value),
    NotificationButtonPressed(String),
    NotificationPressed,
    NotificationDismissed,
}

impl WorkerCall {
    pub const START: &'static str = "start";
    pub const REPEAT_EVENT: &'static str = "onRepeatEvent";
    pub const DESTROY: &'static str = "onDestroy";
    pub const RECEIVE_DATA: &'static str = "onReceiveData";
    pub const NOTIFICATION_BUTTON_PRESSED: &'static str = "onNotificationButtonPressed";
    pub const NOTIFICATION_PRESSED: &'static str = "onNotificationPressed";
    pub const NOTIFICATION_DISMISSED: &'static str = "onNotificationDismissed";

    /// Method name on the wire.
    pub fn method(&self) -> &'static str {
        match self {
            WorkerCall::Start { .. } => Self::START,
            WorkerCall::RepeatEvent => Self::REPEAT_EVENT,
            WorkerCall::Destroy => Self::DESTROY,
            WorkerCall::ReceiveData(_) => Self::RECEIVE_DATA,
            WorkerCall::NotificationButtonPressed(_) => Self::NOTIFICATION_BUTTON_PRESSED,
            WorkerCall::NotificationPressed => Self::NOTIFICATION_PRESSED,
            WorkerCall::NotificationDismissed => Self::NOTIFICATION_DISMISSED,
        }
    }

    /// Arguments on the wire (`Null` when the method takes none).
    pub fn arguments(&self) -> Value {
        match self {
            WorkerCall::Start { reason } => Value::from(reason.as_code()),
            WorkerCall::ReceiveData(payload) => payload.clone(),
            WorkerCall::NotificationButtonPressed(id) => Value::String(id.clone()),
            _ => Value::Null,
        }
    }
}
