//! The screen-lock overlay coordinator.
//!
//! [`LockMachine`] is the state machine: it reacts to screen and keyguard
//! events, drives the overlay and the wake lock, and owns its subscriptions.
//! [`LockCoordinator::spawn`] runs one machine on a dedicated thread and
//! hands back a [`CoordinatorHandle`] for live commands.
//!
//! ```text
//!            start (enabled)            screen on
//!  Stopped ─────────────────▶ Idle ─────────────────▶ Presenting
//!     ▲                        ▲ ◀──────────────────────┘
//!     │          stop          │   screen off / unlock / swipe
//!     └────────────────────────┴──────────────────────────
//! ```

use crate::activity::{Activity, SharedActivityLog};
use crate::bus::{EventBus, SubscriptionId};
use crate::color::Color;
use crate::config::ConfigStore;
use crate::overlay::OverlayPresenter;
use crate::platform::{
    ForegroundNotice, KeepAlive, OverlayInput, Platform, PowerManager, SystemEvent,
};
use crate::wake::{WakeController, MAX_WAKE_HOLD};
use crossbeam_channel::{after, never, select, unbounded, Receiver, Sender};
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Lifecycle state of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoordinatorState {
    Stopped,
    /// Running, overlay hidden
    Idle,
    /// Running, overlay shown
    Presenting,
}

impl std::fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinatorState::Stopped => write!(f, "stopped"),
            CoordinatorState::Idle => write!(f, "idle"),
            CoordinatorState::Presenting => write!(f, "presenting"),
        }
    }
}

/// Point-in-time view of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoordinatorStatus {
    pub state: CoordinatorState,
    pub running: bool,
    pub overlay_visible: bool,
    pub wake_held: bool,
}

impl Default for CoordinatorStatus {
    fn default() -> Self {
        Self {
            state: CoordinatorState::Stopped,
            running: false,
            overlay_visible: false,
            wake_held: false,
        }
    }
}

/// Tunables for a coordinator instance.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// Fail-safe bound on a wake-lock hold; clamped to [`MAX_WAKE_HOLD`]
    pub wake_timeout: Duration,
    pub notice: ForegroundNotice,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            wake_timeout: MAX_WAKE_HOLD,
            notice: ForegroundNotice::default(),
        }
    }
}

/// Live commands accepted by a running coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    UpdateText(String),
    UpdateColors { background: Color, text: Color },
    Input(OverlayInput),
    /// User-requested stop; persists `enabled = false`
    Stop,
    /// The host is going away; `enabled` is left as is
    Terminate,
}

/// Why the coordinator is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Stopped,
    Terminated,
}

/// The overlay state machine.
pub struct LockMachine {
    store: Arc<ConfigStore>,
    bus: Arc<EventBus>,
    events: Sender<SystemEvent>,
    subscriptions: Vec<SubscriptionId>,
    presenter: OverlayPresenter,
    wake: WakeController,
    power: Arc<dyn PowerManager>,
    keep_alive: Box<dyn KeepAlive>,
    settings: CoordinatorSettings,
    activity: SharedActivityLog,
    state: CoordinatorState,
    /// Set on stop; checked before every side effect
    dead: Arc<AtomicBool>,
    status: Arc<Mutex<CoordinatorStatus>>,
}

impl LockMachine {
    /// Build a stopped machine. Events it subscribes to are sent on `events`.
    pub fn new(
        store: Arc<ConfigStore>,
        bus: Arc<EventBus>,
        events: Sender<SystemEvent>,
        platform: Platform,
        settings: CoordinatorSettings,
        activity: SharedActivityLog,
    ) -> Self {
        Self {
            store,
            bus,
            events,
            subscriptions: Vec::new(),
            presenter: OverlayPresenter::new(platform.surface),
            wake: WakeController::new(platform.power.clone()),
            power: platform.power,
            keep_alive: platform.keep_alive,
            settings,
            activity,
            state: CoordinatorState::Stopped,
            dead: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(CoordinatorStatus::default())),
        }
    }

    /// `Stopped → Idle`, if the stored config is enabled.
    pub fn start(&mut self) -> Result<(), CoordinatorError> {
        if self.state != CoordinatorState::Stopped {
            return Err(CoordinatorError::AlreadyRunning);
        }
        if !self.store.get().enabled {
            return Err(CoordinatorError::Disabled);
        }

        self.dead.store(false, Ordering::SeqCst);

        if let Err(e) = self.keep_alive.enter_foreground(&self.settings.notice) {
            warn!("Could not enter foreground, continuing in background: {e}");
        }

        for event in SystemEvent::ALL {
            let id = self.bus.subscribe(event, self.events.clone());
            self.subscriptions.push(id);
        }

        self.state = CoordinatorState::Idle;
        self.sync_status();
        info!("Lock coordinator started");
        Ok(())
    }

    pub fn handle_system(&mut self, event: SystemEvent) {
        if !self.is_live() {
            debug!(?event, "Ignoring event, coordinator not running");
            return;
        }

        match event {
            SystemEvent::ScreenOn => {
                debug!("Screen on, presenting goal");
                self.present();
            }
            SystemEvent::ScreenOff => {
                debug!("Screen off, retracting overlay");
                if self.retract() {
                    self.activity.record(Activity::ScreenOffRetraction);
                }
            }
            SystemEvent::UserPresent => {
                debug!("Keyguard unlocked, retracting overlay");
                if self.retract() {
                    self.activity.record(Activity::UnlockDismissal);
                }
            }
        }
        self.sync_status();
    }

    /// Apply a command. Returns false once the machine has shut down.
    pub fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::UpdateText(text) => {
                if self.is_live() {
                    self.presenter.update_text(&text);
                }
            }
            Command::UpdateColors { background, text } => {
                if self.is_live() {
                    self.presenter.update_colors(background, text);
                }
            }
            Command::Input(input) => {
                if self.is_live() && self.presenter.handle_input(input) {
                    self.wake.release();
                    self.state = CoordinatorState::Idle;
                    self.activity.record(Activity::SwipeDismissal);
                    info!("Overlay dismissed by user");
                }
            }
            Command::Stop => {
                self.shutdown(ShutdownReason::Stopped);
                return false;
            }
            Command::Terminate => {
                self.shutdown(ShutdownReason::Terminated);
                return false;
            }
        }
        self.sync_status();
        true
    }

    /// Release the wake lock if its deadline has passed.
    pub fn expire_wake(&mut self, now: Instant) {
        if self.wake.release_if_expired(now) {
            self.activity.record(Activity::WakeTimeout);
            self.sync_status();
        }
    }

    /// Tear everything down: subscriptions, overlay, wake lock, foreground.
    pub fn shutdown(&mut self, reason: ShutdownReason) {
        self.dead.store(true, Ordering::SeqCst);

        if reason == ShutdownReason::Stopped {
            if let Err(e) = self.store.set_enabled(false) {
                error!("Could not persist disabled state: {e}");
            }
        }

        if self.state == CoordinatorState::Stopped {
            return;
        }

        for id in self.subscriptions.drain(..) {
            self.bus.unsubscribe(id);
        }
        // Every step runs even if an earlier platform call panics.
        contained("hide overlay", || {
            self.presenter.hide();
        });
        contained("release wake lock", || self.wake.release());
        contained("exit foreground", || self.keep_alive.exit_foreground());

        if let Err(e) = self.activity.save() {
            warn!("Could not save activity log: {e}");
        }

        self.state = CoordinatorState::Stopped;
        self.sync_status();
        info!(?reason, "Lock coordinator stopped");
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            state: self.state,
            running: self.state != CoordinatorState::Stopped,
            overlay_visible: self.presenter.is_visible(),
            wake_held: self.wake.is_held(),
        }
    }

    pub fn presenter(&self) -> &OverlayPresenter {
        &self.presenter
    }

    pub fn wake_deadline(&self) -> Option<Instant> {
        self.wake.deadline()
    }

    /// Flag that suppresses all further side effects once set.
    pub fn kill_switch(&self) -> Arc<AtomicBool> {
        self.dead.clone()
    }

    fn status_cell(&self) -> Arc<Mutex<CoordinatorStatus>> {
        self.status.clone()
    }

    fn is_live(&self) -> bool {
        self.state != CoordinatorState::Stopped && !self.dead.load(Ordering::SeqCst)
    }

    /// `Idle → Presenting`. Takes a wake lock first if the panel is not interactive.
    fn present(&mut self) {
        let config = self.store.get();

        let guard = if self.power.is_interactive() {
            None
        } else {
            match self.wake.hold(self.settings.wake_timeout) {
                Ok(guard) => {
                    self.activity.record(Activity::WakeAcquisition);
                    Some(guard)
                }
                Err(e) => {
                    warn!("Could not acquire wake lock: {e}");
                    None
                }
            }
        };

        // A stop may have landed while the wake lock was being taken.
        if self.dead.load(Ordering::SeqCst) {
            return;
        }

        let was_presenting = self.state == CoordinatorState::Presenting;
        if self.presenter.show(&config) {
            if let Some(guard) = guard {
                guard.keep();
            }
            if !was_presenting {
                self.activity.record(Activity::OverlayShown);
            }
            self.state = CoordinatorState::Presenting;
        } else {
            self.activity.record(Activity::PresentationFailure);
            self.state = CoordinatorState::Idle;
        }
    }

    /// `Presenting → Idle`. Returns whether an overlay was removed.
    fn retract(&mut self) -> bool {
        let removed = self.presenter.hide();
        self.wake.release();
        self.state = CoordinatorState::Idle;
        removed
    }

    fn sync_status(&self) {
        let status = self.status();
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = status;
    }
}

impl Drop for LockMachine {
    fn drop(&mut self) {
        if self.state != CoordinatorState::Stopped {
            self.shutdown(ShutdownReason::Terminated);
        }
    }
}

/// Runs a [`LockMachine`] on its own thread.
pub struct LockCoordinator;

impl LockCoordinator {
    /// Start a coordinator. Fails if the stored config is disabled.
    pub fn spawn(
        store: Arc<ConfigStore>,
        bus: Arc<EventBus>,
        platform: Platform,
        settings: CoordinatorSettings,
        activity: SharedActivityLog,
    ) -> Result<CoordinatorHandle, CoordinatorError> {
        let (event_tx, event_rx) = unbounded();
        let (command_tx, command_rx) = unbounded();

        let mut machine = LockMachine::new(store, bus, event_tx, platform, settings, activity);
        machine.start()?;

        let dead = machine.kill_switch();
        let status = machine.status_cell();

        let thread = thread::Builder::new()
            .name("goalock-coordinator".to_string())
            .spawn(move || run_loop(machine, event_rx, command_rx))
            .map_err(|e| CoordinatorError::SpawnFailed(e.to_string()))?;

        Ok(CoordinatorHandle {
            commands: command_tx,
            dead,
            status,
            thread: Some(thread),
        })
    }
}

fn run_loop(mut machine: LockMachine, events: Receiver<SystemEvent>, commands: Receiver<Command>) {
    loop {
        let timer = match machine.wake_deadline() {
            Some(deadline) => after(deadline.saturating_duration_since(Instant::now())),
            None => never(),
        };

        let keep_running = select! {
            recv(events) -> event => match event {
                Ok(event) => guarded(&mut machine, true, |m| {
                    m.handle_system(event);
                    true
                }),
                Err(_) => true,
            },
            recv(commands) -> command => match command {
                Ok(command) => {
                    let teardown = matches!(command, Command::Stop | Command::Terminate);
                    guarded(&mut machine, !teardown, |m| m.handle_command(command))
                }
                Err(_) => {
                    machine.shutdown(ShutdownReason::Terminated);
                    false
                }
            },
            recv(timer) -> _ => guarded(&mut machine, true, |m| {
                m.expire_wake(Instant::now());
                true
            }),
        };

        if !keep_running {
            break;
        }
    }
    debug!("Coordinator thread exiting");
}

/// Run one handler, logging a panic instead of losing the thread.
///
/// After a panic the loop continues only if `resume_on_panic` is set; a
/// panicking stop or terminate still ends the loop so the joiner returns.
fn guarded(
    machine: &mut LockMachine,
    resume_on_panic: bool,
    handler: impl FnOnce(&mut LockMachine) -> bool,
) -> bool {
    match catch_unwind(AssertUnwindSafe(|| handler(&mut *machine))) {
        Ok(keep_running) => keep_running,
        Err(_) => {
            if resume_on_panic {
                error!("Coordinator handler panicked; staying subscribed");
            } else {
                error!("Coordinator panicked during teardown; exiting");
                machine.dead.store(true, Ordering::SeqCst);
            }
            machine.sync_status();
            resume_on_panic
        }
    }
}

/// Run one teardown step, logging a panic so the remaining steps still run.
fn contained(step: &str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        error!(step, "Platform call panicked during shutdown");
    }
}

/// Control handle for a running coordinator.
///
/// Dropping the handle terminates the coordinator.
pub struct CoordinatorHandle {
    commands: Sender<Command>,
    dead: Arc<AtomicBool>,
    status: Arc<Mutex<CoordinatorStatus>>,
    thread: Option<JoinHandle<()>>,
}

impl CoordinatorHandle {
    pub fn update_text(&self, text: impl Into<String>) -> Result<(), CoordinatorError> {
        self.send(Command::UpdateText(text.into()))
    }

    pub fn update_colors(&self, background: Color, text: Color) -> Result<(), CoordinatorError> {
        self.send(Command::UpdateColors { background, text })
    }

    pub fn overlay_input(&self, input: OverlayInput) -> Result<(), CoordinatorError> {
        self.send(Command::Input(input))
    }

    /// Stop and persist `enabled = false`. Blocks until teardown is done.
    pub fn stop(&mut self) {
        self.finish(Command::Stop);
    }

    /// Tear down without touching `enabled`. Blocks until teardown is done.
    pub fn terminate(&mut self) {
        self.finish(Command::Terminate);
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_some() && !self.dead.load(Ordering::SeqCst) && self.status().running
    }

    pub fn status(&self) -> CoordinatorStatus {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn send(&self, command: Command) -> Result<(), CoordinatorError> {
        if self.dead.load(Ordering::SeqCst) {
            return Err(CoordinatorError::NotRunning);
        }
        self.commands
            .send(command)
            .map_err(|_| CoordinatorError::NotRunning)
    }

    fn finish(&mut self, command: Command) {
        // Effective immediately, even before the thread picks up the command.
        self.dead.store(true, Ordering::SeqCst);

        let Some(thread) = self.thread.take() else {
            return;
        };
        if self.commands.send(command).is_err() {
            debug!("Coordinator thread already gone");
        }
        if thread.join().is_err() {
            error!("Coordinator thread panicked during shutdown");
        }
    }
}

impl Drop for CoordinatorHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.terminate();
        }
    }
}

/// Coordinator lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    /// The stored config has `enabled = false`
    Disabled,
    AlreadyRunning,
    NotRunning,
    SpawnFailed(String),
}

impl std::fmt::Display for CoordinatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinatorError::Disabled => write!(f, "Lock screen is disabled in settings"),
            CoordinatorError::AlreadyRunning => write!(f, "Coordinator is already running"),
            CoordinatorError::NotRunning => write!(f, "Coordinator is not running"),
            CoordinatorError::SpawnFailed(e) => write!(f, "Failed to start coordinator: {e}"),
        }
    }
}

impl std::error::Error for CoordinatorError {}
