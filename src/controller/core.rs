//! # ServiceHost: controller-facing surface over one supervisor.
//!
//! Every state-changing command persists a [`ServiceStatus`] first, then acts on
//! the owned [`TaskSupervisor`]:
//! ```text
//! startService   ──► status=Start   ──► save data+options ──► spawn supervisor ──► start
//! updateService  ──► status=Update  ──► save options(+data) ──► supervisor.update
//! stopService    ──► status=Stop    ──► destroy + stopped() ──► clear data+options
//! restartService ──► destroy + stopped() ──► status=Restart ──► spawn from saved config
//! app terminated ──► status=AppTerminate ──► destroy + stopped()
//! ```
//! Permission and UI commands go straight to the [`Platform`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use crate::{
    core::{SupervisorConfig, TaskSupervisor},
    error::HostError,
    events::{Bus, Event},
    listeners::{ListenerRef, ListenerRegistry},
    model::{CallbackHandle, ServiceAction, ServiceStatus, TaskData, TaskOptions},
    store::StoreRef,
    worker::{RuntimeRef, WorkerCall},
};

use super::{
    boot::ServiceLauncher,
    command::{ServiceCommand, ServiceReply},
    platform::{NoopPlatform, NotificationPermission, Platform},
    shutdown,
};

/// Controller in front of the supervisor.
///
/// Owns at most one [`TaskSupervisor`] at a time, persists [`ServiceStatus`] before
/// every transition so the supervisor can tell developer starts from system ones,
/// and keeps the listener registry alive across worker recreation.
pub struct ServiceHost {
    cfg: SupervisorConfig,
    store: StoreRef,
    runtime: RuntimeRef,
    platform: Arc<dyn Platform>,
    listeners: Arc<ListenerRegistry>,

    supervisor: Mutex<Option<TaskSupervisor>>,
}

impl ServiceHost {
    /// Creates an idle host. Platform calls go to [`NoopPlatform`] until
    /// [`ServiceHost::with_platform`] is used.
    pub fn new(cfg: SupervisorConfig, runtime: RuntimeRef, store: StoreRef) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self {
            cfg,
            store,
            runtime,
            platform: Arc::new(NoopPlatform),
            listeners: Arc::new(ListenerRegistry::new(bus)),
            supervisor: Mutex::new(None),
        }
    }

    /// Replaces the platform adapter.
    pub fn with_platform(mut self, platform: Arc<dyn Platform>) -> Self {
        self.platform = platform;
        self
    }

    /// Configuration store shared with every supervisor.
    pub fn store(&self) -> &StoreRef {
        &self.store
    }

    /// Listener registry shared with every supervisor.
    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }

    /// Adds a lifecycle listener. Returns `false` if it was already registered.
    pub fn add_listener(&self, listener: ListenerRef) -> bool {
        self.listeners.add(listener)
    }

    /// Removes a lifecycle listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, listener: &ListenerRef) -> bool {
        self.listeners.remove(listener)
    }

    /// Subscribes to diagnostics events of every supervisor this host creates.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.listeners.bus().subscribe()
    }

    /// Persists `data` and `options`, then starts a supervisor.
    pub async fn start_service(&self, data: TaskData, options: TaskOptions) -> Result<(), HostError> {
        let mut slot = self.supervisor.lock().await;
        if slot.is_some() {
            return Err(HostError::AlreadyRunning);
        }

        self.store.set_task_data(data)?;
        self.store.set_task_options(options)?;
        *slot = Some(self.spawn_supervisor(ServiceAction::Start, data, options)?);
        Ok(())
    }

    /// Persists new options (and entrypoint, when given) and updates the running supervisor.
    pub async fn update_service(
        &self,
        options: TaskOptions,
        callback_handle: Option<CallbackHandle>,
    ) -> Result<(), HostError> {
        let slot = self.supervisor.lock().await;
        let Some(supervisor) = slot.as_ref() else {
            return Err(HostError::NotRunning);
        };

        self.store
            .set_service_status(ServiceStatus::new(ServiceAction::Update))?;
        self.store.set_task_options(options)?;
        if let Some(handle) = callback_handle {
            self.store.set_task_data(TaskData::new(handle))?;
        }
        supervisor.update(options.event_action);
        debug!(?callback_handle, "service update requested");
        Ok(())
    }

    /// Records a deliberate stop, tears the supervisor down and clears the task config.
    pub async fn stop_service(&self) -> Result<(), HostError> {
        let mut slot = self.supervisor.lock().await;
        if slot.is_none() {
            return Err(HostError::NotRunning);
        }

        self.store
            .set_service_status(ServiceStatus::new(ServiceAction::Stop))?;
        let Some(supervisor) = slot.take() else {
            return Err(HostError::NotRunning);
        };
        supervisor.destroy();
        supervisor.stopped().await;

        self.store.clear_task_data()?;
        self.store.clear_task_options()?;
        info!("service stopped");
        Ok(())
    }

    /// Destroys the running supervisor and starts a new one from persisted config.
    pub async fn restart_service(&self) -> Result<(), HostError> {
        let mut slot = self.supervisor.lock().await;
        let Some(supervisor) = slot.take() else {
            return Err(HostError::NotRunning);
        };

        supervisor.destroy();
        supervisor.stopped().await;

        let data = self.store.task_data()?;
        let options = self.store.task_options()?;
        *slot = Some(self.spawn_supervisor(ServiceAction::Restart, data, options)?);
        Ok(())
    }

    /// Forwards `payload` to the worker's `onReceiveData`.
    pub async fn send_data(&self, payload: Value) -> Result<(), HostError> {
        self.forward(WorkerCall::ReceiveData(payload)).await
    }

    /// True while a supervisor is owned by this host.
    pub async fn is_running_service(&self) -> bool {
        self.supervisor.lock().await.is_some()
    }

    /// Forwards a notification button press to the worker.
    pub async fn notification_button_pressed(&self, id: impl Into<String>) {
        self.forward_if_running(WorkerCall::NotificationButtonPressed(id.into()))
            .await;
    }

    /// Forwards a notification tap to the worker.
    pub async fn notification_pressed(&self) {
        self.forward_if_running(WorkerCall::NotificationPressed).await;
    }

    /// Forwards a notification dismissal to the worker.
    pub async fn notification_dismissed(&self) {
        self.forward_if_running(WorkerCall::NotificationDismissed)
            .await;
    }

    /// Current notification permission, as reported by the platform.
    pub async fn check_notification_permission(&self) -> NotificationPermission {
        self.platform.check_notification_permission().await
    }

    /// Asks the platform for notification permission and returns the outcome.
    pub async fn request_notification_permission(&self) -> NotificationPermission {
        self.platform.request_notification_permission().await
    }

    /// Sends the app to the background.
    pub async fn minimize_app(&self) {
        self.platform.minimize_app().await;
    }

    /// Turns the screen on.
    pub async fn wake_up_screen(&self) {
        self.platform.wake_up_screen().await;
    }

    /// Records the app termination and tears the supervisor down.
    pub async fn app_terminated(&self) {
        let mut slot = self.supervisor.lock().await;
        if let Err(e) = self
            .store
            .set_service_status(ServiceStatus::new(ServiceAction::AppTerminate))
        {
            warn!(error = %e, "failed to record app termination");
        }
        if let Some(supervisor) = slot.take() {
            supervisor.destroy();
            supervisor.stopped().await;
            info!("service terminated with the app");
        }
    }

    /// Waits for an OS termination signal, then takes the app-terminate path.
    pub async fn run_until_terminated(&self) -> std::io::Result<()> {
        shutdown::wait_for_shutdown_signal().await?;
        self.app_terminated().await;
        Ok(())
    }

    /// Executes a decoded controller command.
    pub async fn handle(&self, cmd: ServiceCommand) -> Result<ServiceReply, HostError> {
        debug!(method = cmd.method(), "controller command");
        match cmd {
            ServiceCommand::StartService { data, options } => {
                self.start_service(data, options).await?;
            }
            ServiceCommand::UpdateService {
                options,
                callback_handle,
            } => self.update_service(options, callback_handle).await?,
            ServiceCommand::StopService => self.stop_service().await?,
            ServiceCommand::RestartService => self.restart_service().await?,
            ServiceCommand::SendData(payload) => self.send_data(payload).await?,
            ServiceCommand::IsRunningService => {
                return Ok(ServiceReply::Running(self.is_running_service().await));
            }
            ServiceCommand::CheckNotificationPermission => {
                return Ok(ServiceReply::Permission(
                    self.check_notification_permission().await,
                ));
            }
            ServiceCommand::RequestNotificationPermission => {
                return Ok(ServiceReply::Permission(
                    self.request_notification_permission().await,
                ));
            }
            ServiceCommand::MinimizeApp => self.minimize_app().await,
            ServiceCommand::WakeUpScreen => self.wake_up_screen().await,
        }
        Ok(ServiceReply::Done)
    }

    /// Records `action` and starts a fresh supervisor for `data`.
    fn spawn_supervisor(
        &self,
        action: ServiceAction,
        data: TaskData,
        options: TaskOptions,
    ) -> Result<TaskSupervisor, HostError> {
        self.store.set_service_status(ServiceStatus::new(action))?;

        let supervisor = TaskSupervisor::builder(Arc::clone(&self.runtime))
            .with_config(self.cfg.clone())
            .with_store(Arc::clone(&self.store))
            .with_listeners(Arc::clone(&self.listeners))
            .build();
        supervisor.start(data, options.event_action);
        info!(?action, entrypoint = ?data.callback_handle, "service launched");
        Ok(supervisor)
    }

    async fn forward(&self, call: WorkerCall) -> Result<(), HostError> {
        let slot = self.supervisor.lock().await;
        let Some(supervisor) = slot.as_ref() else {
            return Err(HostError::NotRunning);
        };
        supervisor.invoke(call);
        Ok(())
    }

    async fn forward_if_running(&self, call: WorkerCall) {
        let method = call.method();
        if self.forward(call).await.is_err() {
            debug!(method, "no service running; notification interaction dropped");
        }
    }
}

#[async_trait]
impl ServiceLauncher for ServiceHost {
    async fn is_running(&self) -> bool {
        self.is_running_service().await
    }

    async fn launch(&self, action: ServiceAction) -> Result<(), HostError> {
        let mut slot = self.supervisor.lock().await;
        if slot.is_some() {
            return Err(HostError::AlreadyRunning);
        }
        let data = self.store.task_data()?;
        let options = self.store.task_options()?;
        *slot = Some(self.spawn_supervisor(action, data, options)?);
        Ok(())
    }

    async fn terminate(&self) {
        self.app_terminated().await;
    }
}
