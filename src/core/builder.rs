use std::sync::Arc;

use crate::{
    core::{SupervisorConfig, TaskSupervisor},
    events::Bus,
    listeners::ListenerRegistry,
    store::{MemoryStore, StoreRef},
    worker::RuntimeRef,
};

/// Builder for constructing a [`TaskSupervisor`] with optional collaborators.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    runtime: RuntimeRef,
    store: Option<StoreRef>,
    listeners: Option<Arc<ListenerRegistry>>,
}

impl SupervisorBuilder {
    /// Creates a builder driving workers through `runtime`.
    pub fn new(runtime: RuntimeRef) -> Self {
        Self {
            cfg: SupervisorConfig::default(),
            runtime,
            store: None,
            listeners: None,
        }
    }

    /// Overrides the default configuration.
    pub fn with_config(mut self, cfg: SupervisorConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets the configuration store read on `start` (starter reason) and `update`
    /// (callback handle). Defaults to an empty [`MemoryStore`].
    pub fn with_store(mut self, store: StoreRef) -> Self {
        self.store = Some(store);
        self
    }

    /// Shares an existing listener registry (and its bus).
    ///
    /// Listeners registered there outlive this supervisor, which is how a host keeps
    /// them across worker recreation.
    pub fn with_listeners(mut self, listeners: Arc<ListenerRegistry>) -> Self {
        self.listeners = Some(listeners);
        self
    }

    /// Builds the supervisor and spawns its actor.
    ///
    /// Must be called within a Tokio runtime.
    pub fn build(self) -> TaskSupervisor {
        let listeners = self.listeners.unwrap_or_else(|| {
            Arc::new(ListenerRegistry::new(Bus::new(
                self.cfg.bus_capacity_clamped(),
            )))
        });
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as StoreRef);

        TaskSupervisor::spawn(self.cfg, store, self.runtime, listeners)
    }
}
