//! Demonstration of the Goalock overlay coordinator.
//!
//! This example shows how to:
//! 1. Configure the goal and colors
//! 2. Start the lock service on the headless platform
//! 3. Drive it with screen and keyguard events
//! 4. Dismiss the overlay with a swipe
//! 5. Read the activity summary
//!
//! Run with: cargo run --example overlay_demo
//!
//! Set GOALOCK_LOG=debug to see every platform call.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use goalock::{
    create_shared_log, Color, ConfigStore, ConfigUpdate, EventBus, HeadlessPlatform,
    LockService, OverlayInput, SwipeDirection, SwipeDetector, SystemEvent,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("GOALOCK_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("Goalock - Overlay Demo");
    println!("======================");
    println!();

    // Settings live in memory so the demo leaves nothing behind
    let store = Arc::new(ConfigStore::in_memory());
    store
        .set(ConfigUpdate::goal_text("Read 20 pages before scrolling"))
        .expect("Failed to save goal");
    store
        .set(ConfigUpdate::colors(Color::rgb(0x1E, 0x88, 0xE5), Color::WHITE))
        .expect("Failed to save colors");
    store.set_enabled(true).expect("Failed to enable");

    let platform = Arc::new(HeadlessPlatform::new());
    let activity = create_shared_log();
    let service = LockService::new(store, Arc::new(EventBus::new()), platform.clone(), activity.clone());

    service.start().expect("Failed to start lock service");
    println!("Lock service running: {}", service.is_running());
    println!();

    let step = |label: &str| {
        // Events are handled on the coordinator thread
        thread::sleep(Duration::from_millis(50));
        let status = service.status();
        println!(
            "{label:<28} state={:<10} overlay={:<5} wake={}",
            status.state.to_string(),
            status.overlay_visible,
            status.wake_held
        );
    };

    step("started");

    // Screen goes dark, then the user picks the phone up
    platform.set_interactive(false);
    service.bus().publish(SystemEvent::ScreenOff);
    step("screen off");
    service.bus().publish(SystemEvent::ScreenOn);
    step("screen on");

    // Back does nothing; a swipe up dismisses
    service.overlay_input(OverlayInput::Back);
    step("back pressed");

    let detector = SwipeDetector::default();
    let swipe = detector
        .classify(12.0, -340.0, 0.0, -1200.0)
        .unwrap_or(SwipeDirection::Up);
    service.overlay_input(OverlayInput::Swipe(swipe));
    step(&format!("swipe {swipe:?}"));

    // Next wake-up, the user unlocks straight away
    platform.set_interactive(false);
    service.bus().publish(SystemEvent::ScreenOff);
    service.bus().publish(SystemEvent::ScreenOn);
    step("screen on again");
    service.update_text("Still reading?");
    step("goal edited live");
    service.bus().publish(SystemEvent::UserPresent);
    step("unlocked");

    service.terminate();
    step("terminated");

    println!();
    println!("{}", activity.summary());
}
