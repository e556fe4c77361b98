//! Values exchanged with the platform layer.

use crate::color::Color;
use crate::config::LockConfig;
use serde::{Deserialize, Serialize};

/// Hint rendered under the goal text.
pub const DISMISS_HINT: &str = "Swipe to dismiss";

/// System-level signals the coordinator reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemEvent {
    /// The display turned off
    ScreenOff,
    /// The display turned on
    ScreenOn,
    /// The user unlocked the platform's own keyguard
    UserPresent,
}

impl SystemEvent {
    /// Every event the coordinator subscribes to.
    pub const ALL: [SystemEvent; 3] = [
        SystemEvent::ScreenOff,
        SystemEvent::ScreenOn,
        SystemEvent::UserPresent,
    ];

    /// Map a platform broadcast action to an event.
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "android.intent.action.SCREEN_OFF" => Some(SystemEvent::ScreenOff),
            "android.intent.action.SCREEN_ON" => Some(SystemEvent::ScreenOn),
            "android.intent.action.USER_PRESENT" => Some(SystemEvent::UserPresent),
            _ => None,
        }
    }

    pub fn action(self) -> &'static str {
        match self {
            SystemEvent::ScreenOff => "android.intent.action.SCREEN_OFF",
            SystemEvent::ScreenOn => "android.intent.action.SCREEN_ON",
            SystemEvent::UserPresent => "android.intent.action.USER_PRESENT",
        }
    }
}

/// Direction of a completed swipe on the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwipeDirection {
    Left,
    Right,
    Up,
    Down,
}

/// User input delivered by the overlay surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayInput {
    Swipe(SwipeDirection),
    /// Back navigation; never dismisses the overlay
    Back,
}

/// What the overlay surface renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayContent {
    pub goal_text: String,
    pub background: Color,
    pub text_color: Color,
    pub hint: String,
}

impl OverlayContent {
    pub fn from_config(config: &LockConfig) -> Self {
        Self {
            goal_text: config.goal_text.clone(),
            background: config.background_color,
            text_color: config.text_color,
            hint: DISMISS_HINT.to_string(),
        }
    }
}

/// Persistent notification shown while the coordinator runs in the foreground.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundNotice {
    pub channel_id: String,
    pub channel_name: String,
    pub notification_id: i32,
    pub title: String,
    pub text: String,
    pub low_priority: bool,
    pub ongoing: bool,
}

impl Default for ForegroundNotice {
    fn default() -> Self {
        Self {
            channel_id: "goalock_channel".to_string(),
            channel_name: "GoalLock Service".to_string(),
            notification_id: 1001,
            title: "GoalLock is running".to_string(),
            text: "Your goal will appear when the screen turns on".to_string(),
            low_priority: true,
            ongoing: true,
        }
    }
}

/// Identifier of an outstanding permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PermissionRequestId(uuid::Uuid);

impl PermissionRequestId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for PermissionRequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PermissionRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_mapping() {
        for event in SystemEvent::ALL {
            assert_eq!(SystemEvent::from_action(event.action()), Some(event));
        }
        assert_eq!(SystemEvent::from_action("android.intent.action.BOOT_COMPLETED"), None);
    }

    #[test]
    fn test_content_from_config() {
        let config = LockConfig {
            goal_text: "Ship it".to_string(),
            ..LockConfig::default()
        };
        let content = OverlayContent::from_config(&config);
        assert_eq!(content.goal_text, "Ship it");
        assert_eq!(content.background, Color::GREEN);
        assert_eq!(content.hint, DISMISS_HINT);
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(PermissionRequestId::new(), PermissionRequestId::new());
    }
}
