//! Controller-facing command vocabulary.
//!
//! [`ServiceCommand::parse`] decodes a `(method, arguments)` pair as received from
//! a host channel; [`ServiceReply`] is what [`ServiceHost::handle`](crate::ServiceHost::handle)
//! answers with.
//!
//! ## Arguments
//! ```text
//! startService    {"callbackHandle": <i64>|null, "eventAction": {...}, "autoRunOnBoot": <bool>, ...}
//! updateService   same shape as startService; "callbackHandle" replaces the entrypoint when set
//! sendData        any JSON value
//! others          ignored
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::controller::NotificationPermission;
use crate::error::HostError;
use crate::model::{CallbackHandle, TaskData, TaskOptions};

/// Decoded controller command.
#[derive(Clone, Debug, PartialEq)]
pub enum ServiceCommand {
    StartService {
        data: TaskData,
        options: TaskOptions,
    },
    UpdateService {
        options: TaskOptions,
        callback_handle: Option<CallbackHandle>,
    },
    StopService,
    RestartService,
    SendData(Value),
    IsRunningService,
    CheckNotificationPermission,
    RequestNotificationPermission,
    MinimizeApp,
    WakeUpScreen,
}

/// Arguments shared by `startService` and `updateService`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceArgs {
    #[serde(default)]
    callback_handle: Option<CallbackHandle>,
    #[serde(flatten)]
    options: TaskOptions,
}

impl ServiceCommand {
    /// Decodes `method` with its `args`.
    ///
    /// # Errors
    /// - [`HostError::UnknownCommand`] for a method outside the vocabulary;
    /// - [`HostError::InvalidArguments`] when `args` do not match the method.
    pub fn parse(method: &str, args: Value) -> Result<Self, HostError> {
        let cmd = match method {
            "startService" => {
                let args = service_args(method, args)?;
                ServiceCommand::StartService {
                    data: TaskData {
                        callback_handle: args.callback_handle,
                    },
                    options: args.options,
                }
            }
            "updateService" => {
                let args = service_args(method, args)?;
                ServiceCommand::UpdateService {
                    options: args.options,
                    callback_handle: args.callback_handle,
                }
            }
            "stopService" => ServiceCommand::StopService,
            "restartService" => ServiceCommand::RestartService,
            "sendData" => ServiceCommand::SendData(args),
            "isRunningService" => ServiceCommand::IsRunningService,
            "checkNotificationPermission" => ServiceCommand::CheckNotificationPermission,
            "requestNotificationPermission" => ServiceCommand::RequestNotificationPermission,
            "minimizeApp" => ServiceCommand::MinimizeApp,
            "wakeUpScreen" => ServiceCommand::WakeUpScreen,
            other => return Err(HostError::UnknownCommand(other.to_string())),
        };
        Ok(cmd)
    }

    /// Method name on the wire.
    pub fn method(&self) -> &'static str {
        match self {
            ServiceCommand::StartService { .. } => "startService",
            ServiceCommand::UpdateService { .. } => "updateService",
            ServiceCommand::StopService => "stopService",
            ServiceCommand::RestartService => "restartService",
            ServiceCommand::SendData(_) => "sendData",
            ServiceCommand::IsRunningService => "isRunningService",
            ServiceCommand::CheckNotificationPermission => "checkNotificationPermission",
            ServiceCommand::RequestNotificationPermission => "requestNotificationPermission",
            ServiceCommand::MinimizeApp => "minimizeApp",
            ServiceCommand::WakeUpScreen => "wakeUpScreen",
        }
    }
}

fn service_args(method: &str, args: Value) -> Result<ServiceArgs, HostError> {
    let args = match args {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(args).map_err(|e| HostError::InvalidArguments {
        method: method.to_string(),
        reason: e.to_string(),
    })
}

/// Successful outcome of a [`ServiceCommand`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceReply {
    /// The command was carried out.
    Done,
    /// Answer to `isRunningService`.
    Running(bool),
    /// Answer to a permission command.
    Permission(NotificationPermission),
}

impl ServiceReply {
    /// Wire representation: `true`, the running flag, or the permission name.
    pub fn to_value(self) -> Value {
        match self {
            ServiceReply::Done => Value::Bool(true),
            ServiceReply::Running(running) => Value::Bool(running),
            ServiceReply::Permission(p) => serde_json::to_value(p).unwrap_or(Value::Null),
        }
    }
}
