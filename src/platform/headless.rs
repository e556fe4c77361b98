//! Headless implementation of the platform seams.
//!
//! This exists so the coordinator can be hosted on a desktop (or any target
//! without a window-overlay subsystem). Every call is logged and tracked in
//! memory; nothing is drawn. The overlay permission is always granted.

use super::{
    ForegroundNotice, KeepAlive, OverlayContent, OverlaySurface, PermissionGate,
    PermissionRequestId, Platform, PlatformError, PlatformFactory, PowerManager,
};
use crate::color::Color;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Factory and permission gate for headless hosting.
#[derive(Debug, Clone)]
pub struct HeadlessPlatform {
    interactive: Arc<AtomicBool>,
}

impl HeadlessPlatform {
    pub fn new() -> Self {
        Self {
            interactive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Record the simulated display power state.
    pub fn set_interactive(&self, interactive: bool) {
        self.interactive.store(interactive, Ordering::SeqCst);
    }
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformFactory for HeadlessPlatform {
    fn create(&self) -> Platform {
        Platform {
            surface: Box::new(HeadlessSurface::default()),
            power: Arc::new(HeadlessPower {
                interactive: self.interactive.clone(),
                held: AtomicBool::new(false),
            }),
            keep_alive: Box::new(HeadlessKeepAlive),
        }
    }
}

impl PermissionGate for HeadlessPlatform {
    fn is_granted(&self) -> bool {
        true
    }

    fn request(&self, id: PermissionRequestId) -> Result<(), PlatformError> {
        info!(%id, "Overlay permission is implicit on this host");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct HeadlessSurface {
    content: Option<OverlayContent>,
}

impl OverlaySurface for HeadlessSurface {
    fn attach(&mut self, content: &OverlayContent) -> Result<(), PlatformError> {
        info!(
            goal = %content.goal_text,
            background = %content.background,
            text = %content.text_color,
            "[overlay] attached"
        );
        self.content = Some(content.clone());
        Ok(())
    }

    fn detach(&mut self) -> Result<(), PlatformError> {
        info!("[overlay] detached");
        self.content = None;
        Ok(())
    }

    fn set_text(&mut self, text: &str) -> Result<(), PlatformError> {
        let content = self
            .content
            .as_mut()
            .ok_or_else(|| PlatformError::Rejected("no surface attached".into()))?;
        content.goal_text = text.to_string();
        info!(goal = %text, "[overlay] text updated");
        Ok(())
    }

    fn set_colors(&mut self, background: Color, text: Color) -> Result<(), PlatformError> {
        let content = self
            .content
            .as_mut()
            .ok_or_else(|| PlatformError::Rejected("no surface attached".into()))?;
        content.background = background;
        content.text_color = text;
        info!(%background, %text, "[overlay] colors updated");
        Ok(())
    }
}

#[derive(Debug)]
struct HeadlessPower {
    interactive: Arc<AtomicBool>,
    held: AtomicBool,
}

impl PowerManager for HeadlessPower {
    fn is_interactive(&self) -> bool {
        self.interactive.load(Ordering::SeqCst)
    }

    fn acquire_wake_lock(&self, timeout: Duration) -> Result<(), PlatformError> {
        self.held.store(true, Ordering::SeqCst);
        // A wake-up lock turns the panel on.
        self.interactive.store(true, Ordering::SeqCst);
        info!(timeout_secs = timeout.as_secs(), "[power] wake lock acquired");
        Ok(())
    }

    fn release_wake_lock(&self) -> Result<(), PlatformError> {
        if self.held.swap(false, Ordering::SeqCst) {
            info!("[power] wake lock released");
        }
        Ok(())
    }
}

#[derive(Debug)]
struct HeadlessKeepAlive;

impl KeepAlive for HeadlessKeepAlive {
    fn enter_foreground(&mut self, notice: &ForegroundNotice) -> Result<(), PlatformError> {
        info!(title = %notice.title, "[service] running in foreground");
        Ok(())
    }

    fn exit_foreground(&mut self) {
        info!("[service] left foreground");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LockConfig;

    #[test]
    fn test_headless_surface_requires_attach_for_updates() {
        let platform = HeadlessPlatform::new();
        let mut parts = platform.create();

        assert!(parts.surface.set_text("too early").is_err());
        parts
            .surface
            .attach(&OverlayContent::from_config(&LockConfig::default()))
            .unwrap();
        assert!(parts.surface.set_text("now").is_ok());
        assert!(parts.surface.detach().is_ok());
    }

    #[test]
    fn test_interactive_flag_is_shared() {
        let platform = HeadlessPlatform::new();
        let parts = platform.create();
        assert!(parts.power.is_interactive());
        platform.set_interactive(false);
        assert!(!parts.power.is_interactive());
        assert!(platform.is_granted());

        parts.power.acquire_wake_lock(Duration::from_secs(1)).unwrap();
        assert!(parts.power.is_interactive());
        parts.power.release_wake_lock().unwrap();
    }
}
