//! Host platform capabilities the controller delegates to.
//!
//! Permission prompts and window management are outside the supervisor's reach;
//! an embedding application provides them through [`Platform`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of a notification permission check or request.
///
/// Returned as a value, never as an error: a denied permission is an answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationPermission {
    Granted,
    Denied,
    /// Denied and the platform will not prompt again.
    PermanentlyDenied,
}

impl NotificationPermission {
    /// True when notifications may be posted.
    pub fn is_granted(self) -> bool {
        self == NotificationPermission::Granted
    }
}

/// # UI and permission side of the host.
#[async_trait]
pub trait Platform: Send + Sync + 'static {
    /// Current notification permission, without prompting.
    async fn check_notification_permission(&self) -> NotificationPermission;

    /// Prompts for notification permission if the platform allows it.
    async fn request_notification_permission(&self) -> NotificationPermission;

    /// Moves the app to the background.
    async fn minimize_app(&self) {}

    /// Turns the screen on.
    async fn wake_up_screen(&self) {}
}

/// [`Platform`] for headless hosts: permissions are always granted, UI calls do nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPlatform;

#[async_trait]
impl Platform for NoopPlatform {
    async fn check_notification_permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    async fn request_notification_permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }
}
