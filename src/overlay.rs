//! The goal overlay.
//!
//! [`OverlayPresenter`] owns the single overlay surface. Showing and hiding
//! are idempotent, and platform failures are logged and treated as "no
//! overlay" rather than surfaced.

use crate::color::Color;
use crate::config::LockConfig;
use crate::platform::{OverlayContent, OverlayInput, OverlaySurface, SwipeDirection};
use tracing::{debug, error, info, warn};

/// Owns the overlay surface and what it currently shows.
pub struct OverlayPresenter {
    surface: Box<dyn OverlaySurface>,
    /// Set while a surface is attached
    content: Option<OverlayContent>,
}

impl OverlayPresenter {
    pub fn new(surface: Box<dyn OverlaySurface>) -> Self {
        Self {
            surface,
            content: None,
        }
    }

    /// Attach the overlay for `config`. No-op if one is already attached.
    ///
    /// Returns whether an overlay is visible afterwards.
    pub fn show(&mut self, config: &LockConfig) -> bool {
        if self.content.is_some() {
            debug!("Overlay already visible");
            return true;
        }

        let content = OverlayContent::from_config(config);
        match self.surface.attach(&content) {
            Ok(()) => {
                info!("Overlay shown");
                self.content = Some(content);
                true
            }
            Err(e) => {
                error!("Failed to show overlay: {e}");
                false
            }
        }
    }

    /// Detach the overlay. Returns true if one was attached.
    ///
    /// A failed detach is logged and the overlay is still considered gone;
    /// it is not retried.
    pub fn hide(&mut self) -> bool {
        if self.content.take().is_none() {
            return false;
        }

        match self.surface.detach() {
            Ok(()) => info!("Overlay hidden"),
            Err(e) => error!("Failed to hide overlay: {e}"),
        }
        true
    }

    /// Replace the goal text on the attached overlay, if any.
    pub fn update_text(&mut self, text: &str) {
        let Some(content) = self.content.as_mut() else {
            return;
        };

        match self.surface.set_text(text) {
            Ok(()) => content.goal_text = text.to_string(),
            Err(e) => warn!("Failed to update overlay text: {e}"),
        }
    }

    /// Replace the colors on the attached overlay, if any.
    pub fn update_colors(&mut self, background: Color, text: Color) {
        let Some(content) = self.content.as_mut() else {
            return;
        };

        match self.surface.set_colors(background, text) {
            Ok(()) => {
                content.background = background;
                content.text_color = text;
            }
            Err(e) => warn!("Failed to update overlay colors: {e}"),
        }
    }

    /// React to user input on the overlay. Returns true if it was dismissed.
    ///
    /// A swipe in any direction dismisses; back navigation never does.
    pub fn handle_input(&mut self, input: OverlayInput) -> bool {
        match input {
            OverlayInput::Swipe(direction) => {
                debug!(?direction, "Swipe on overlay");
                self.hide()
            }
            OverlayInput::Back => {
                debug!("Back navigation ignored on overlay");
                false
            }
        }
    }

    pub fn is_visible(&self) -> bool {
        self.content.is_some()
    }

    /// What the attached overlay is rendering.
    pub fn content(&self) -> Option<&OverlayContent> {
        self.content.as_ref()
    }
}

/// Classifies a completed touch gesture as a swipe.
#[derive(Debug, Clone, Copy)]
pub struct SwipeDetector {
    /// Minimum travel along the dominant axis, in pixels
    pub distance_threshold: f32,
    /// Minimum fling velocity along the dominant axis, in pixels per second
    pub velocity_threshold: f32,
}

impl Default for SwipeDetector {
    fn default() -> Self {
        Self {
            distance_threshold: 100.0,
            velocity_threshold: 100.0,
        }
    }
}

impl SwipeDetector {
    /// `dx`/`dy` are the travel from touch-down to touch-up (y grows downward),
    /// `vx`/`vy` the release velocity.
    pub fn classify(&self, dx: f32, dy: f32, vx: f32, vy: f32) -> Option<SwipeDirection> {
        if dx.abs() > dy.abs() {
            if dx.abs() > self.distance_threshold && vx.abs() > self.velocity_threshold {
                return Some(if dx > 0.0 {
                    SwipeDirection::Right
                } else {
                    SwipeDirection::Left
                });
            }
        } else if dy.abs() > self.distance_threshold && vy.abs() > self.velocity_threshold {
            return Some(if dy > 0.0 {
                SwipeDirection::Down
            } else {
                SwipeDirection::Up
            });
        }
        None
    }
}
