//! Seams to the operating system.
//!
//! The coordinator never talks to the OS directly. Each collaborator it
//! needs (the overlay window, the power manager, the foreground keep-alive,
//! the overlay permission) is a trait here, so a mobile embedding, the
//! headless desktop host, and the test fakes all plug in the same way.

pub mod headless;
pub mod types;

use crate::color::Color;
use std::sync::Arc;
use std::time::Duration;

pub use headless::HeadlessPlatform;
pub use types::{
    ForegroundNotice, OverlayContent, OverlayInput, PermissionRequestId, SwipeDirection,
    SystemEvent, DISMISS_HINT,
};

/// The full-screen window the goal is drawn on.
pub trait OverlaySurface: Send {
    /// Attach a topmost, full-screen surface rendering `content`.
    fn attach(&mut self, content: &OverlayContent) -> Result<(), PlatformError>;

    /// Remove the surface.
    fn detach(&mut self) -> Result<(), PlatformError>;

    /// Replace the goal text of the attached surface.
    fn set_text(&mut self, text: &str) -> Result<(), PlatformError>;

    /// Replace the colors of the attached surface.
    fn set_colors(&mut self, background: Color, text: Color) -> Result<(), PlatformError>;
}

/// Display power primitives.
pub trait PowerManager: Send + Sync {
    /// Whether the display is currently on and interactive.
    fn is_interactive(&self) -> bool;

    /// Acquire a wake lock that turns the display on. The platform must drop
    /// it by itself once `timeout` elapses.
    fn acquire_wake_lock(&self, timeout: Duration) -> Result<(), PlatformError>;

    fn release_wake_lock(&self) -> Result<(), PlatformError>;
}

/// Keeps the coordinator's host alive while it runs in the background.
pub trait KeepAlive: Send {
    fn enter_foreground(&mut self, notice: &ForegroundNotice) -> Result<(), PlatformError>;

    fn exit_foreground(&mut self);
}

/// The permission to draw over other applications.
pub trait PermissionGate: Send + Sync {
    fn is_granted(&self) -> bool;

    /// Launch the platform's permission flow. The outcome is reported later
    /// through `ControlBridge::on_permission_result` with the same id.
    fn request(&self, id: PermissionRequestId) -> Result<(), PlatformError>;
}

/// The collaborators one coordinator instance runs against.
pub struct Platform {
    pub surface: Box<dyn OverlaySurface>,
    pub power: Arc<dyn PowerManager>,
    pub keep_alive: Box<dyn KeepAlive>,
}

/// Produces a fresh [`Platform`] for each coordinator start.
pub trait PlatformFactory: Send + Sync {
    fn create(&self) -> Platform;
}

/// Errors reported by platform collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    PermissionDenied(String),
    Rejected(String),
    Unavailable(String),
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformError::PermissionDenied(e) => write!(f, "Permission denied: {e}"),
            PlatformError::Rejected(e) => write!(f, "Rejected by platform: {e}"),
            PlatformError::Unavailable(e) => write!(f, "Platform service unavailable: {e}"),
        }
    }
}

impl std::error::Error for PlatformError {}
