//! # Boot trigger: relaunches the service after OS-level events.
//!
//! ```text
//! BootSignal ──► BootTrigger::handle
//!                  │
//!                  ├─ AppTerminate ───────────────────────────► launcher.terminate()      → Terminated
//!                  │
//!                  ├─ read ServiceStatus ── action == Stop ───► Suppressed(DeliberatelyStopped)
//!                  ├─ policy.stop_with_task ──────────────────► Suppressed(StopWithTask)
//!                  ├─ read TaskOptions ── auto-run flag off ──► Suppressed(AutoRunDisabled)
//!                  ├─ launcher.is_running() ──────────────────► Suppressed(AlreadyRunning)
//!                  └─ launcher.launch(Reboot | SystemRestart) ► Launched
//! ```
//!
//! | signal            | required flag                  | recorded action |
//! |-------------------|--------------------------------|-----------------|
//! | `BootCompleted`   | `auto_run_on_boot`             | `Reboot`        |
//! | `PackageReplaced` | `auto_run_on_my_package_replaced` | `Reboot`     |
//! | `RestartAlarm`    | none                           | `SystemRestart` |
//!
//! Every relaunch records a system action, so the worker starts with
//! [`StarterReason::System`](crate::StarterReason::System).

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::HostError;
use crate::model::ServiceAction;
use crate::store::StoreRef;

/// OS-level event the trigger reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootSignal {
    /// The device finished booting.
    BootCompleted,
    /// The hosting package was replaced by an update.
    PackageReplaced,
    /// A scheduled restart alarm fired.
    RestartAlarm,
    /// The hosting app is being terminated.
    AppTerminate,
}

/// Hosting-process policy consulted before relaunching.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BootPolicy {
    /// The service must not outlive removal of its task; never relaunch.
    pub stop_with_task: bool,
}

/// Why a relaunch did not happen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuppressReason {
    /// The developer stopped the service on purpose.
    DeliberatelyStopped,
    /// [`BootPolicy::stop_with_task`] is set.
    StopWithTask,
    /// The auto-run flag for this signal is off.
    AutoRunDisabled,
    /// A service is already running.
    AlreadyRunning,
    /// Persisted configuration could not be read.
    StoreUnavailable,
    /// The launcher refused to start the service.
    LaunchFailed,
}

/// What [`BootTrigger::handle`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootOutcome {
    /// The service was started with the recorded action.
    Launched(ServiceAction),
    /// The running service was torn down.
    Terminated,
    /// Nothing was started.
    Suppressed(SuppressReason),
}

/// # Starts and stops the service on behalf of the trigger.
///
/// Implemented by [`ServiceHost`](crate::ServiceHost).
#[async_trait]
pub trait ServiceLauncher: Send + Sync + 'static {
    /// True if a service is currently running.
    async fn is_running(&self) -> bool;

    /// Records `action` as the service status and starts from persisted config.
    async fn launch(&self, action: ServiceAction) -> Result<(), HostError>;

    /// Takes the app-terminate path.
    async fn terminate(&self);
}

/// Maps [`BootSignal`]s onto the launcher.
pub struct BootTrigger {
    store: StoreRef,
    launcher: Arc<dyn ServiceLauncher>,
    policy: BootPolicy,
}

impl BootTrigger {
    pub fn new(store: StoreRef, launcher: Arc<dyn ServiceLauncher>) -> Self {
        Self {
            store,
            launcher,
            policy: BootPolicy::default(),
        }
    }

    /// Sets the hosting-process policy.
    pub fn with_policy(mut self, policy: BootPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Reacts to `signal`.
    pub async fn handle(&self, signal: BootSignal) -> BootOutcome {
        let outcome = self.decide(signal).await;
        match outcome {
            BootOutcome::Suppressed(reason) => {
                debug!(?signal, ?reason, "relaunch suppressed");
            }
            other => info!(?signal, outcome = ?other, "boot signal handled"),
        }
        outcome
    }

    async fn decide(&self, signal: BootSignal) -> BootOutcome {
        let action = match signal {
            BootSignal::AppTerminate => {
                self.launcher.terminate().await;
                return BootOutcome::Terminated;
            }
            BootSignal::BootCompleted | BootSignal::PackageReplaced => ServiceAction::Reboot,
            BootSignal::RestartAlarm => ServiceAction::SystemRestart,
        };

        let status = match self.store.service_status() {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "service status unreadable");
                return BootOutcome::Suppressed(SuppressReason::StoreUnavailable);
            }
        };
        if status.is_correctly_stopped() {
            return BootOutcome::Suppressed(SuppressReason::DeliberatelyStopped);
        }
        if self.policy.stop_with_task {
            return BootOutcome::Suppressed(SuppressReason::StopWithTask);
        }

        let options = match self.store.task_options() {
            Ok(options) => options,
            Err(e) => {
                warn!(error = %e, "task options unreadable");
                return BootOutcome::Suppressed(SuppressReason::StoreUnavailable);
            }
        };
        let enabled = match signal {
            BootSignal::BootCompleted => options.auto_run_on_boot,
            BootSignal::PackageReplaced => options.auto_run_on_my_package_replaced,
            _ => true,
        };
        if !enabled {
            return BootOutcome::Suppressed(SuppressReason::AutoRunDisabled);
        }

        if self.launcher.is_running().await {
            return BootOutcome::Suppressed(SuppressReason::AlreadyRunning);
        }
        match self.launcher.launch(action).await {
            Ok(()) => BootOutcome::Launched(action),
            Err(HostError::AlreadyRunning) => {
                BootOutcome::Suppressed(SuppressReason::AlreadyRunning)
            }
            Err(e) => {
                warn!(error = %e, ?action, "relaunch failed");
                BootOutcome::Suppressed(SuppressReason::LaunchFailed)
            }
        }
    }
}
