//! Host for at most one running coordinator.
//!
//! This is the process-level owner the bridge, the boot trigger and the CLI
//! all talk to. It keeps the coordinator handle, builds a fresh set of
//! platform collaborators for each start, and shares the config store, the
//! event bus and the activity log with everything else in the process.

use crate::activity::SharedActivityLog;
use crate::bus::EventBus;
use crate::color::Color;
use crate::config::{ConfigError, ConfigStore};
use crate::coordinator::{
    CoordinatorError, CoordinatorHandle, CoordinatorSettings, CoordinatorStatus, LockCoordinator,
};
use crate::platform::{OverlayInput, PlatformFactory};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

pub struct LockService {
    store: Arc<ConfigStore>,
    bus: Arc<EventBus>,
    factory: Arc<dyn PlatformFactory>,
    settings: CoordinatorSettings,
    activity: SharedActivityLog,
    coordinator: Mutex<Option<CoordinatorHandle>>,
}

impl LockService {
    pub fn new(
        store: Arc<ConfigStore>,
        bus: Arc<EventBus>,
        factory: Arc<dyn PlatformFactory>,
        activity: SharedActivityLog,
    ) -> Self {
        Self {
            store,
            bus,
            factory,
            settings: CoordinatorSettings::default(),
            activity,
            coordinator: Mutex::new(None),
        }
    }

    pub fn with_settings(mut self, settings: CoordinatorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Start the coordinator. Returns false if one was already running.
    pub fn start(&self) -> Result<bool, CoordinatorError> {
        let mut slot = self.slot();

        if let Some(handle) = slot.as_mut() {
            if handle.is_running() {
                debug!("Coordinator already running");
                return Ok(false);
            }
            handle.terminate();
        }
        *slot = None;

        let handle = LockCoordinator::spawn(
            self.store.clone(),
            self.bus.clone(),
            self.factory.create(),
            self.settings.clone(),
            self.activity.clone(),
        )?;
        *slot = Some(handle);
        info!("Lock service started");
        Ok(true)
    }

    /// Stop the coordinator and persist `enabled = false`.
    pub fn stop(&self) -> Result<(), ConfigError> {
        match self.slot().take() {
            Some(mut handle) => {
                handle.stop();
                info!("Lock service stopped");
                Ok(())
            }
            // Nothing to tear down, but the intent must still be persisted.
            None => self.store.set_enabled(false),
        }
    }

    /// Tear down the coordinator without touching `enabled`.
    pub fn terminate(&self) {
        if let Some(mut handle) = self.slot().take() {
            handle.terminate();
            info!("Lock service terminated");
        }
    }

    pub fn is_running(&self) -> bool {
        self.slot().as_ref().is_some_and(CoordinatorHandle::is_running)
    }

    pub fn status(&self) -> CoordinatorStatus {
        self.slot()
            .as_ref()
            .map(CoordinatorHandle::status)
            .unwrap_or_default()
    }

    /// Forward a goal text change to the running coordinator, if any.
    ///
    /// Returns whether a coordinator received it.
    pub fn update_text(&self, text: &str) -> bool {
        self.forward(|handle| handle.update_text(text))
    }

    pub fn update_colors(&self, background: Color, text: Color) -> bool {
        self.forward(|handle| handle.update_colors(background, text))
    }

    pub fn overlay_input(&self, input: OverlayInput) -> bool {
        self.forward(|handle| handle.overlay_input(input))
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn activity(&self) -> &SharedActivityLog {
        &self.activity
    }

    fn forward(
        &self,
        send: impl FnOnce(&CoordinatorHandle) -> Result<(), CoordinatorError>,
    ) -> bool {
        match self.slot().as_ref() {
            Some(handle) => match send(handle) {
                Ok(()) => true,
                Err(e) => {
                    debug!("Live update not delivered: {e}");
                    false
                }
            },
            None => false,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<CoordinatorHandle>> {
        self.coordinator.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for LockService {
    fn drop(&mut self) {
        self.terminate();
    }
}
