//! Command surface for the settings UI.
//!
//! The UI layer sends method calls (`start`, `setGoalText`, ...) which the
//! bridge turns into config writes and live coordinator commands. Commands
//! that need the overlay permission suspend on a oneshot keyed by
//! [`PermissionRequestId`] until the platform reports back through
//! [`ControlBridge::on_permission_result`].

use crate::color::Color;
use crate::config::{ConfigError, ConfigUpdate};
use crate::platform::{PermissionGate, PermissionRequestId};
use crate::service::LockService;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// A request from the UI layer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// A call without arguments.
    pub fn bare(method: impl Into<String>) -> Self {
        Self::new(method, Value::Null)
    }

    fn arg_str(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }

    fn required_str(&self, key: &str) -> Result<&str, BridgeError> {
        self.arg_str(key)
            .ok_or_else(|| BridgeError::InvalidArgument(format!("missing string argument '{key}'")))
    }
}

struct PendingPermission {
    id: PermissionRequestId,
    reply: oneshot::Sender<bool>,
}

/// Translates UI method calls into store writes and coordinator commands.
pub struct ControlBridge {
    service: Arc<LockService>,
    gate: Arc<dyn PermissionGate>,
    /// At most one outstanding permission request
    pending: Mutex<Option<PendingPermission>>,
}

impl ControlBridge {
    pub fn new(service: Arc<LockService>, gate: Arc<dyn PermissionGate>) -> Self {
        Self {
            service,
            gate,
            pending: Mutex::new(None),
        }
    }

    /// Route a method call. Unknown methods fail with `NOT_IMPLEMENTED`.
    pub async fn dispatch(&self, call: &MethodCall) -> Result<Value, BridgeError> {
        debug!(method = %call.method, "Bridge call");
        match call.method.as_str() {
            "start" | "startLockScreenService" => self.start().await.map(Value::Bool),
            "stop" | "stopLockScreenService" => self.stop().map(Value::Bool),
            "setGoalText" => self.set_goal_text(call.arg_str("text")).map(Value::Bool),
            "setColors" => {
                let background = call.required_str("backgroundColor")?;
                let text = call.required_str("textColor")?;
                self.set_colors(background, text).map(Value::Bool)
            }
            "setBackgroundColor" => self
                .set_background_color(call.required_str("color")?)
                .map(Value::Bool),
            "setTextColor" => self
                .set_text_color(call.required_str("color")?)
                .map(Value::Bool),
            "queryEnabled" | "isLockScreenServiceEnabled" => Ok(Value::Bool(self.query_enabled())),
            "queryPermissionGranted" | "checkPermissions" => {
                Ok(Value::Bool(self.query_permission_granted()))
            }
            "requestPermission" | "requestPermissions" => {
                self.request_permission().await.map(Value::Bool)
            }
            other => Err(BridgeError::NotImplemented(other.to_string())),
        }
    }

    /// Persist `enabled = true` and start the coordinator.
    ///
    /// Without the overlay permission this first runs the permission flow and
    /// only completes the start once it is granted. A denied permission
    /// answers false and leaves everything untouched.
    pub async fn start(&self) -> Result<bool, BridgeError> {
        if !self.gate.is_granted() {
            info!("Overlay permission missing, requesting before start");
            if !self.request_permission().await? {
                warn!("Overlay permission denied, not starting");
                return Ok(false);
            }
        }

        self.service.store().set_enabled(true)?;
        self.service
            .start()
            .map_err(|e| BridgeError::CoordinatorFailed(e.to_string()))?;
        Ok(true)
    }

    /// Persist `enabled = false` and stop the coordinator.
    pub fn stop(&self) -> Result<bool, BridgeError> {
        self.service.stop()?;
        Ok(true)
    }

    pub fn set_goal_text(&self, text: Option<&str>) -> Result<bool, BridgeError> {
        let text =
            text.ok_or_else(|| BridgeError::InvalidArgument("goal text is required".to_string()))?;

        self.service.store().set(ConfigUpdate::goal_text(text))?;
        self.service.update_text(text);
        Ok(true)
    }

    pub fn set_colors(&self, background: &str, text: &str) -> Result<bool, BridgeError> {
        let background = parse_color("backgroundColor", background)?;
        let text = parse_color("textColor", text)?;

        self.service.store().set(ConfigUpdate::colors(background, text))?;
        self.service.update_colors(background, text);
        Ok(true)
    }

    pub fn set_background_color(&self, color: &str) -> Result<bool, BridgeError> {
        let background = parse_color("backgroundColor", color)?;
        self.service.store().set(ConfigUpdate {
            background_color: Some(background),
            ..ConfigUpdate::default()
        })?;

        let text = self.service.store().get().text_color;
        self.service.update_colors(background, text);
        Ok(true)
    }

    pub fn set_text_color(&self, color: &str) -> Result<bool, BridgeError> {
        let text = parse_color("textColor", color)?;
        self.service.store().set(ConfigUpdate {
            text_color: Some(text),
            ..ConfigUpdate::default()
        })?;

        let background = self.service.store().get().background_color;
        self.service.update_colors(background, text);
        Ok(true)
    }

    /// Whether a coordinator is currently running.
    pub fn query_enabled(&self) -> bool {
        self.service.is_running()
    }

    pub fn query_permission_granted(&self) -> bool {
        self.gate.is_granted()
    }

    /// Run the platform permission flow and wait for its outcome.
    ///
    /// Resolves immediately when already granted. A second request while one
    /// is outstanding fails with `PERMISSION_PENDING`.
    pub async fn request_permission(&self) -> Result<bool, BridgeError> {
        if self.gate.is_granted() {
            return Ok(true);
        }

        let id = PermissionRequestId::new();
        let (reply, outcome) = oneshot::channel();
        {
            let mut pending = self.pending();
            if pending.is_some() {
                return Err(BridgeError::PermissionPending);
            }
            *pending = Some(PendingPermission { id, reply });
        }
        // Clears the slot if this future is dropped before the callback.
        let _slot = PendingSlot { bridge: self, id };

        info!(%id, "Requesting overlay permission");
        self.gate
            .request(id)
            .map_err(|e| BridgeError::PermissionFlowFailed(e.to_string()))?;

        outcome.await.map_err(|_| {
            BridgeError::PermissionFlowFailed("permission request was abandoned".to_string())
        })
    }

    /// Deliver the platform's permission result for request `id`.
    ///
    /// The gate is re-queried rather than trusting the platform's result code.
    /// Returns false if `id` is not the outstanding request.
    pub fn on_permission_result(&self, id: PermissionRequestId) -> bool {
        let mut pending = self.pending();
        match pending.take() {
            Some(request) if request.id == id => {
                let granted = self.gate.is_granted();
                info!(%id, granted, "Overlay permission result");
                if request.reply.send(granted).is_err() {
                    debug!(%id, "Permission requester went away");
                }
                true
            }
            Some(other) => {
                warn!(%id, outstanding = %other.id, "Ignoring result for unknown permission request");
                *pending = Some(other);
                false
            }
            None => {
                warn!(%id, "Ignoring permission result with nothing outstanding");
                false
            }
        }
    }

    /// Id of the outstanding permission request, if any.
    pub fn pending_request(&self) -> Option<PermissionRequestId> {
        self.pending().as_ref().map(|p| p.id)
    }

    pub fn service(&self) -> &Arc<LockService> {
        &self.service
    }

    fn pending(&self) -> MutexGuard<'_, Option<PendingPermission>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct PendingSlot<'a> {
    bridge: &'a ControlBridge,
    id: PermissionRequestId,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        let mut pending = self.bridge.pending();
        if pending.as_ref().is_some_and(|p| p.id == self.id) {
            *pending = None;
        }
    }
}

fn parse_color(field: &str, value: &str) -> Result<Color, BridgeError> {
    Color::parse(value).map_err(|e| BridgeError::InvalidArgument(format!("{field}: {e}")))
}

/// Bridge errors, each with a method-call error code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    InvalidArgument(String),
    PermissionPending,
    PermissionFlowFailed(String),
    ConfigWriteFailed(String),
    CoordinatorFailed(String),
    NotImplemented(String),
}

impl BridgeError {
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::InvalidArgument(_) => "INVALID_ARGUMENT",
            BridgeError::PermissionPending => "PERMISSION_PENDING",
            BridgeError::PermissionFlowFailed(_) => "PERMISSION_FLOW_FAILED",
            BridgeError::ConfigWriteFailed(_) => "CONFIG_WRITE_FAILED",
            BridgeError::CoordinatorFailed(_) => "COORDINATOR_FAILED",
            BridgeError::NotImplemented(_) => "NOT_IMPLEMENTED",
        }
    }
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeError::InvalidArgument(e) => write!(f, "Invalid argument: {e}"),
            BridgeError::PermissionPending => {
                write!(f, "A permission request is already in progress")
            }
            BridgeError::PermissionFlowFailed(e) => write!(f, "Permission flow failed: {e}"),
            BridgeError::ConfigWriteFailed(e) => write!(f, "Could not save settings: {e}"),
            BridgeError::CoordinatorFailed(e) => write!(f, "Coordinator error: {e}"),
            BridgeError::NotImplemented(method) => write!(f, "Method not implemented: {method}"),
        }
    }
}

impl std::error::Error for BridgeError {}

impl From<ConfigError> for BridgeError {
    fn from(e: ConfigError) -> Self {
        BridgeError::ConfigWriteFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::create_shared_log;
    use crate::bus::EventBus;
    use crate::config::ConfigStore;
    use crate::platform::HeadlessPlatform;
    use serde_json::json;

    fn bridge() -> ControlBridge {
        let platform = Arc::new(HeadlessPlatform::new());
        let service = Arc::new(LockService::new(
            Arc::new(ConfigStore::in_memory()),
            Arc::new(EventBus::new()),
            platform.clone(),
            create_shared_log(),
        ));
        ControlBridge::new(service, platform)
    }

    #[test]
    fn test_method_call_deserializes_without_arguments() {
        let call: MethodCall = serde_json::from_str(r#"{"method":"queryEnabled"}"#).unwrap();
        assert_eq!(call, MethodCall::bare("queryEnabled"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(BridgeError::PermissionPending.code(), "PERMISSION_PENDING");
        assert_eq!(
            BridgeError::from(ConfigError::IoError("disk full".into())).code(),
            "CONFIG_WRITE_FAILED"
        );
    }

    #[tokio::test]
    async fn test_null_goal_text_is_rejected() {
        let bridge = bridge();
        let err = bridge
            .dispatch(&MethodCall::new("setGoalText", json!({ "text": null })))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let bridge = bridge();
        let err = bridge.dispatch(&MethodCall::bare("selfDestruct")).await.unwrap_err();
        assert_eq!(err, BridgeError::NotImplemented("selfDestruct".into()));
    }

    #[tokio::test]
    async fn test_split_color_commands() {
        let bridge = bridge();
        bridge
            .dispatch(&MethodCall::new("setBackgroundColor", json!({ "color": "#000000" })))
            .await
            .unwrap();
        bridge
            .dispatch(&MethodCall::new("setTextColor", json!({ "color": "red" })))
            .await
            .unwrap();

        let config = bridge.service().store().get();
        assert_eq!(config.background_color, Color::BLACK);
        assert_eq!(config.text_color, Color::rgb(0xFF, 0, 0));
    }
}
