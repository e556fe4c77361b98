//! Integration tests for the control bridge and its permission flow.

mod common;

use common::{wait_until, Call, FakePlatform};
use goalock::{
    create_shared_log, BridgeError, Color, ConfigStore, ControlBridge, CoordinatorState, EventBus,
    LockService, MethodCall, SystemEvent,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn setup(platform: &FakePlatform) -> Arc<ControlBridge> {
    let service = Arc::new(LockService::new(
        Arc::new(ConfigStore::in_memory()),
        Arc::new(EventBus::new()),
        Arc::new(platform.clone()),
        create_shared_log(),
    ));
    Arc::new(ControlBridge::new(service, Arc::new(platform.clone())))
}

async fn call(bridge: &ControlBridge, method: &str, arguments: Value) -> Result<Value, BridgeError> {
    bridge.dispatch(&MethodCall::new(method, arguments)).await
}

/// Wait for the bridge to register an outstanding permission request.
async fn pending_id(bridge: &ControlBridge) -> goalock::platform::PermissionRequestId {
    for _ in 0..200 {
        if let Some(id) = bridge.pending_request() {
            return id;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("no permission request was made");
}

#[tokio::test]
async fn test_start_with_permission() {
    let platform = FakePlatform::new();
    let bridge = setup(&platform);

    assert_eq!(call(&bridge, "start", Value::Null).await.unwrap(), json!(true));
    assert!(bridge.query_enabled());
    assert!(bridge.service().store().get().enabled);
    assert!(platform.permission_requests().is_empty());

    bridge.service().terminate();
}

#[tokio::test]
async fn test_start_waits_for_permission_grant() {
    let platform = FakePlatform::new();
    platform.set_granted(false);
    let bridge = setup(&platform);

    let starter = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.start().await }
    });

    let id = pending_id(&bridge).await;
    assert_eq!(platform.permission_requests(), vec![id]);
    // Nothing happens until the platform answers.
    assert!(!bridge.query_enabled());
    assert!(!bridge.service().store().get().enabled);
    assert_eq!(bridge.service().status().state, CoordinatorState::Stopped);

    platform.set_granted(true);
    assert!(bridge.on_permission_result(id));
    assert_eq!(starter.await.unwrap(), Ok(true));

    assert!(bridge.query_enabled());
    assert!(bridge.service().store().get().enabled);
    assert!(bridge.pending_request().is_none());
    bridge.service().terminate();
}

#[tokio::test]
async fn test_denied_permission_does_not_start() {
    let platform = FakePlatform::new();
    platform.set_granted(false);
    let bridge = setup(&platform);

    let starter = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.start().await }
    });

    let id = pending_id(&bridge).await;
    // The result is re-checked against the gate, which still says no.
    assert!(bridge.on_permission_result(id));
    assert_eq!(starter.await.unwrap(), Ok(false));

    assert!(!bridge.query_enabled());
    assert!(!bridge.service().store().get().enabled);
}

#[tokio::test]
async fn test_second_permission_request_is_rejected() {
    let platform = FakePlatform::new();
    platform.set_granted(false);
    let bridge = setup(&platform);

    let first = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.request_permission().await }
    });
    let id = pending_id(&bridge).await;

    let err = call(&bridge, "requestPermission", Value::Null)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "PERMISSION_PENDING");
    assert_eq!(bridge.pending_request(), Some(id));

    platform.set_granted(true);
    bridge.on_permission_result(id);
    assert_eq!(first.await.unwrap(), Ok(true));
}

#[tokio::test]
async fn test_result_for_unknown_request_is_ignored() {
    let platform = FakePlatform::new();
    platform.set_granted(false);
    let bridge = setup(&platform);

    assert!(!bridge.on_permission_result(goalock::platform::PermissionRequestId::new()));

    let waiter = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.request_permission().await }
    });
    let id = pending_id(&bridge).await;

    assert!(!bridge.on_permission_result(goalock::platform::PermissionRequestId::new()));
    assert_eq!(bridge.pending_request(), Some(id));

    // Resumes exactly once.
    assert!(bridge.on_permission_result(id));
    assert!(!bridge.on_permission_result(id));
    assert_eq!(waiter.await.unwrap(), Ok(false));
}

#[tokio::test]
async fn test_abandoned_request_frees_the_slot() {
    let platform = FakePlatform::new();
    platform.set_granted(false);
    let bridge = setup(&platform);

    let waiter = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.request_permission().await }
    });
    pending_id(&bridge).await;

    waiter.abort();
    let _ = waiter.await;
    assert!(bridge.pending_request().is_none());
}

#[tokio::test]
async fn test_failed_permission_flow() {
    let platform = FakePlatform::new();
    platform.set_granted(false);
    platform.fail_request(true);
    let bridge = setup(&platform);

    let err = call(&bridge, "start", Value::Null).await.unwrap_err();
    assert_eq!(err.code(), "PERMISSION_FLOW_FAILED");
    assert!(bridge.pending_request().is_none());
    assert!(!bridge.query_enabled());
}

#[tokio::test]
async fn test_set_goal_text_updates_overlay_live() {
    let platform = FakePlatform::new();
    let bridge = setup(&platform);
    bridge.start().await.unwrap();

    let service = bridge.service();
    service.bus().publish(SystemEvent::ScreenOn);
    assert!(wait_until(|| service.status().state == CoordinatorState::Presenting));

    let result = call(&bridge, "setGoalText", json!({ "text": "Finish the report" }))
        .await
        .unwrap();
    assert_eq!(result, json!(true));
    assert_eq!(service.store().get().goal_text, "Finish the report");

    assert!(wait_until(|| platform
        .calls()
        .contains(&Call::Text("Finish the report".into()))));
    assert_eq!(platform.attaches(), 1);
    assert_eq!(platform.detaches(), 0);

    service.terminate();
}

#[tokio::test]
async fn test_goal_text_is_stored_while_stopped() {
    let platform = FakePlatform::new();
    let bridge = setup(&platform);

    bridge.set_goal_text(Some("Go for a run")).unwrap();
    assert_eq!(bridge.service().store().get().goal_text, "Go for a run");

    // The next show renders the stored text.
    bridge.start().await.unwrap();
    bridge.service().bus().publish(SystemEvent::ScreenOn);
    assert!(wait_until(|| platform
        .calls()
        .contains(&Call::Attach("Go for a run".into()))));
    bridge.service().terminate();
}

#[tokio::test]
async fn test_set_colors() {
    let platform = FakePlatform::new();
    let bridge = setup(&platform);

    let result = call(
        &bridge,
        "setColors",
        json!({ "backgroundColor": "#FF000000", "textColor": "#FFFFFF" }),
    )
    .await
    .unwrap();
    assert_eq!(result, json!(true));

    let config = bridge.service().store().get();
    assert_eq!(config.background_color, Color::BLACK);
    assert_eq!(config.text_color, Color::WHITE);
}

#[tokio::test]
async fn test_unparsable_color_is_rejected() {
    let platform = FakePlatform::new();
    let bridge = setup(&platform);

    let err = call(
        &bridge,
        "setColors",
        json!({ "backgroundColor": "not-a-color", "textColor": "#FFFFFF" }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "INVALID_ARGUMENT");

    let err = call(&bridge, "setColors", json!({ "textColor": "#FFFFFF" }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_ARGUMENT");

    // Nothing was written.
    let config = bridge.service().store().get();
    assert_eq!(config.background_color, Color::GREEN);
    assert_eq!(config.text_color, Color::WHITE);
}

#[tokio::test]
async fn test_stop_persists_disabled() {
    let platform = FakePlatform::new();
    let bridge = setup(&platform);

    bridge.start().await.unwrap();
    assert_eq!(call(&bridge, "stop", Value::Null).await.unwrap(), json!(true));
    assert!(!bridge.query_enabled());
    assert!(!bridge.service().store().get().enabled);
    assert_eq!(bridge.service().bus().subscriber_count(), 0);

    // Stopping again is fine.
    assert_eq!(call(&bridge, "stop", Value::Null).await.unwrap(), json!(true));
}

#[tokio::test]
async fn test_start_twice_runs_one_coordinator() {
    let platform = FakePlatform::new();
    let bridge = setup(&platform);

    assert_eq!(bridge.start().await, Ok(true));
    assert_eq!(bridge.start().await, Ok(true));
    assert_eq!(bridge.service().bus().subscriber_count(), 3);
    assert_eq!(platform.count(|c| matches!(c, Call::EnterForeground(_))), 1);

    bridge.service().terminate();
    assert!(bridge.service().store().get().enabled);
}

#[tokio::test]
async fn test_legacy_method_names() {
    let platform = FakePlatform::new();
    let bridge = setup(&platform);

    assert_eq!(
        call(&bridge, "checkPermissions", Value::Null).await.unwrap(),
        json!(true)
    );
    assert_eq!(
        call(&bridge, "startLockScreenService", Value::Null).await.unwrap(),
        json!(true)
    );
    assert_eq!(
        call(&bridge, "isLockScreenServiceEnabled", Value::Null)
            .await
            .unwrap(),
        json!(true)
    );
    assert_eq!(
        call(&bridge, "stopLockScreenService", Value::Null).await.unwrap(),
        json!(true)
    );
    assert_eq!(
        call(&bridge, "queryEnabled", Value::Null).await.unwrap(),
        json!(false)
    );
}
