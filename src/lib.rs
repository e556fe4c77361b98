//! Goalock - a goal reminder that sits on top of the lock screen.
//!
//! Every time the screen turns on, a full-screen overlay shows the user's
//! goal. A swipe dismisses it; unlocking the device or turning the screen
//! off retracts it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                           Goalock                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  EventBus   │──▶│ Coordinator │──▶│   Overlay   │       │
//! │  │ (screen on/ │   │   (state    │   │  Presenter  │       │
//! │  │ off, unlock)│   │   machine)  │   └─────────────┘       │
//! │  └─────────────┘   └─────────────┘──▶┌─────────────┐       │
//! │                      ▲      │        │    Wake     │       │
//! │  ┌─────────────┐     │      ▼        │ Controller  │       │
//! │  │   Control   │─────┘ ┌─────────┐   └─────────────┘       │
//! │  │   Bridge    │──────▶│ Config  │                          │
//! │  └─────────────┘       │  Store  │                          │
//! │                        └─────────┘                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The OS is reached only through the traits in [`platform`]; the
//! [`platform::HeadlessPlatform`] implementation lets the whole thing run on
//! a desktop.
//!
//! # Example
//!
//! ```no_run
//! use goalock::{create_shared_log, ConfigStore, EventBus, HeadlessPlatform, LockService};
//! use std::sync::Arc;
//!
//! let store = Arc::new(ConfigStore::open_default());
//! store.set_enabled(true).expect("Failed to save settings");
//!
//! let service = LockService::new(
//!     store,
//!     Arc::new(EventBus::new()),
//!     Arc::new(HeadlessPlatform::new()),
//!     create_shared_log(),
//! );
//! service.start().expect("Failed to start coordinator");
//!
//! // Screen events are published on service.bus()
//! ```

pub mod activity;
pub mod boot;
pub mod bridge;
pub mod bus;
pub mod color;
pub mod config;
pub mod coordinator;
pub mod overlay;
pub mod platform;
pub mod service;
pub mod wake;

// Re-export key types at crate root for convenience
pub use activity::{
    create_shared_log, create_shared_log_with_persistence, Activity, ActivityLog, ActivityStats,
    SharedActivityLog,
};
pub use bridge::{BridgeError, ControlBridge, MethodCall};
pub use bus::{EventBus, SubscriptionId};
pub use color::{Color, ColorParseError};
pub use config::{ConfigError, ConfigStore, ConfigUpdate, LockConfig};
pub use coordinator::{
    CoordinatorError, CoordinatorHandle, CoordinatorSettings, CoordinatorState, CoordinatorStatus,
    LockCoordinator, LockMachine,
};
pub use overlay::{OverlayPresenter, SwipeDetector};
pub use platform::{HeadlessPlatform, OverlayInput, PlatformError, SwipeDirection, SystemEvent};
pub use service::LockService;
pub use wake::{WakeController, WakeGuard, MAX_WAKE_HOLD};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// What the app needs from the device, shown before asking for permission.
pub const PERMISSIONS_NOTICE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                  GOALOCK - PERMISSIONS                           ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  Goalock shows your goal every time the screen turns on.         ║
║                                                                  ║
║  ✓ WHAT IT NEEDS:                                                ║
║    • Display over other apps (to draw the goal overlay)          ║
║    • Wake lock (to turn the screen on, at most 10 minutes)       ║
║    • Foreground service (to keep listening for the screen)       ║
║    • Run at startup (to come back after a reboot)                ║
║                                                                  ║
║  ✗ WHAT IT NEVER DOES:                                           ║
║    • Replace or bypass your device lock                          ║
║    • Read what is on your screen                                 ║
║    • Send anything off the device                                ║
║                                                                  ║
║  A swipe in any direction dismisses the overlay. Turn it off     ║
║  anytime with:                                                   ║
║    goalock stop                                                  ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
