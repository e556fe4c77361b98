//! Recording fakes of the platform seams, shared by the integration tests.

#![allow(dead_code)]

use crossbeam_channel::{unbounded, Receiver};
use goalock::coordinator::CoordinatorSettings;
use goalock::platform::{
    ForegroundNotice, KeepAlive, OverlayContent, OverlaySurface, PermissionGate,
    PermissionRequestId, Platform, PlatformError, PlatformFactory, PowerManager,
};
use goalock::{create_shared_log, Color, ConfigStore, EventBus, LockMachine, SharedActivityLog, SystemEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Attach(String),
    Detach,
    Text(String),
    Colors(Color, Color),
    Acquire(Duration),
    Release,
    EnterForeground(i32),
    ExitForeground,
}

#[derive(Default)]
struct Shared {
    calls: Mutex<Vec<Call>>,
    interactive: AtomicBool,
    fail_attach: AtomicBool,
    panic_on_attach: AtomicBool,
    panic_on_detach: AtomicBool,
    fail_foreground: AtomicBool,
    granted: AtomicBool,
    fail_request: AtomicBool,
    requests: Mutex<Vec<PermissionRequestId>>,
}

impl Shared {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Factory and permission gate whose collaborators record every call.
#[derive(Clone, Default)]
pub struct FakePlatform {
    shared: Arc<Shared>,
}

impl FakePlatform {
    /// Panel interactive, permission granted.
    pub fn new() -> Self {
        let platform = Self::default();
        platform.set_interactive(true);
        platform.set_granted(true);
        platform
    }

    pub fn calls(&self) -> Vec<Call> {
        self.shared.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    pub fn attaches(&self) -> usize {
        self.count(|c| matches!(c, Call::Attach(_)))
    }

    pub fn detaches(&self) -> usize {
        self.count(|c| *c == Call::Detach)
    }

    pub fn acquires(&self) -> usize {
        self.count(|c| matches!(c, Call::Acquire(_)))
    }

    /// Wake locks acquired and not yet released.
    pub fn outstanding_wake(&self) -> usize {
        self.acquires() - self.count(|c| *c == Call::Release)
    }

    pub fn set_interactive(&self, interactive: bool) {
        self.shared.interactive.store(interactive, Ordering::SeqCst);
    }

    pub fn fail_attach(&self, fail: bool) {
        self.shared.fail_attach.store(fail, Ordering::SeqCst);
    }

    pub fn panic_on_attach(&self, panic: bool) {
        self.shared.panic_on_attach.store(panic, Ordering::SeqCst);
    }

    pub fn panic_on_detach(&self, panic: bool) {
        self.shared.panic_on_detach.store(panic, Ordering::SeqCst);
    }

    pub fn fail_foreground(&self, fail: bool) {
        self.shared.fail_foreground.store(fail, Ordering::SeqCst);
    }

    pub fn set_granted(&self, granted: bool) {
        self.shared.granted.store(granted, Ordering::SeqCst);
    }

    pub fn fail_request(&self, fail: bool) {
        self.shared.fail_request.store(fail, Ordering::SeqCst);
    }

    pub fn permission_requests(&self) -> Vec<PermissionRequestId> {
        self.shared.requests.lock().unwrap().clone()
    }
}

impl PlatformFactory for FakePlatform {
    fn create(&self) -> Platform {
        Platform {
            surface: Box::new(FakeSurface(self.shared.clone())),
            power: Arc::new(FakePower(self.shared.clone())),
            keep_alive: Box::new(FakeKeepAlive(self.shared.clone())),
        }
    }
}

impl PermissionGate for FakePlatform {
    fn is_granted(&self) -> bool {
        self.shared.granted.load(Ordering::SeqCst)
    }

    fn request(&self, id: PermissionRequestId) -> Result<(), PlatformError> {
        if self.shared.fail_request.load(Ordering::SeqCst) {
            return Err(PlatformError::Unavailable("settings screen".into()));
        }
        self.shared.requests.lock().unwrap().push(id);
        Ok(())
    }
}

struct FakeSurface(Arc<Shared>);

impl OverlaySurface for FakeSurface {
    fn attach(&mut self, content: &OverlayContent) -> Result<(), PlatformError> {
        if self.0.panic_on_attach.load(Ordering::SeqCst) {
            panic!("window manager crashed");
        }
        if self.0.fail_attach.load(Ordering::SeqCst) {
            return Err(PlatformError::PermissionDenied("overlay window".into()));
        }
        self.0.record(Call::Attach(content.goal_text.clone()));
        Ok(())
    }

    fn detach(&mut self) -> Result<(), PlatformError> {
        if self.0.panic_on_detach.load(Ordering::SeqCst) {
            panic!("window manager crashed");
        }
        self.0.record(Call::Detach);
        Ok(())
    }

    fn set_text(&mut self, text: &str) -> Result<(), PlatformError> {
        self.0.record(Call::Text(text.to_string()));
        Ok(())
    }

    fn set_colors(&mut self, background: Color, text: Color) -> Result<(), PlatformError> {
        self.0.record(Call::Colors(background, text));
        Ok(())
    }
}

struct FakePower(Arc<Shared>);

impl PowerManager for FakePower {
    fn is_interactive(&self) -> bool {
        self.0.interactive.load(Ordering::SeqCst)
    }

    fn acquire_wake_lock(&self, timeout: Duration) -> Result<(), PlatformError> {
        self.0.record(Call::Acquire(timeout));
        Ok(())
    }

    fn release_wake_lock(&self) -> Result<(), PlatformError> {
        self.0.record(Call::Release);
        Ok(())
    }
}

struct FakeKeepAlive(Arc<Shared>);

impl KeepAlive for FakeKeepAlive {
    fn enter_foreground(&mut self, notice: &ForegroundNotice) -> Result<(), PlatformError> {
        if self.0.fail_foreground.load(Ordering::SeqCst) {
            return Err(PlatformError::Rejected("background start not allowed".into()));
        }
        self.0.record(Call::EnterForeground(notice.notification_id));
        Ok(())
    }

    fn exit_foreground(&mut self) {
        self.0.record(Call::ExitForeground);
    }
}

pub fn enabled_store() -> Arc<ConfigStore> {
    let store = Arc::new(ConfigStore::in_memory());
    store.set_enabled(true).unwrap();
    store
}

/// A machine driven synchronously from the test thread.
pub struct Rig {
    pub platform: FakePlatform,
    pub store: Arc<ConfigStore>,
    pub bus: Arc<EventBus>,
    pub activity: SharedActivityLog,
    pub machine: LockMachine,
    events: Receiver<SystemEvent>,
}

impl Rig {
    pub fn new(store: Arc<ConfigStore>, settings: CoordinatorSettings) -> Self {
        let platform = FakePlatform::new();
        let bus = Arc::new(EventBus::new());
        let activity = create_shared_log();
        let (tx, events) = unbounded();
        let machine = LockMachine::new(
            store.clone(),
            bus.clone(),
            tx,
            platform.create(),
            settings,
            activity.clone(),
        );
        Self {
            platform,
            store,
            bus,
            activity,
            machine,
            events,
        }
    }

    /// Publish on the bus and let the machine consume whatever it subscribed to.
    pub fn publish(&mut self, event: SystemEvent) {
        self.bus.publish(event);
        while let Ok(event) = self.events.try_recv() {
            self.machine.handle_system(event);
        }
    }
}

pub fn rig() -> Rig {
    Rig::new(enabled_store(), CoordinatorSettings::default())
}

/// Poll `condition` until it holds or two seconds pass.
pub fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
