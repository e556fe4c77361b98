//! Restart after boot.
//!
//! When the device finishes booting the coordinator is brought back up if
//! the user left it enabled, after a short delay to let the system settle.

use crate::coordinator::CoordinatorError;
use crate::service::LockService;
use std::time::Duration;
use tracing::{debug, info};

/// Broadcast actions that mean "the device just booted".
pub const BOOT_ACTIONS: [&str; 3] = [
    "android.intent.action.BOOT_COMPLETED",
    "android.intent.action.QUICKBOOT_POWERON",
    "com.htc.intent.action.QUICKBOOT_POWERON",
];

pub const BOOT_SETTLE_DELAY: Duration = Duration::from_secs(1);

pub fn is_boot_action(action: &str) -> bool {
    BOOT_ACTIONS.contains(&action)
}

/// Start the coordinator if it is enabled. Returns whether one was started.
pub async fn on_boot_completed(
    service: &LockService,
    settle_delay: Duration,
) -> Result<bool, CoordinatorError> {
    if !service.store().get().enabled {
        info!("Lock screen disabled, not starting after boot");
        return Ok(false);
    }

    tokio::time::sleep(settle_delay).await;

    // The user may have turned it off while we waited.
    if !service.store().get().enabled {
        debug!("Lock screen disabled during boot delay");
        return Ok(false);
    }

    let started = service.start()?;
    info!(started, "Boot start complete");
    Ok(started)
}

/// Handle a platform broadcast; anything but a boot action is ignored.
pub async fn handle_broadcast(
    service: &LockService,
    action: &str,
) -> Result<bool, CoordinatorError> {
    if !is_boot_action(action) {
        debug!(action, "Ignoring non-boot broadcast");
        return Ok(false);
    }
    on_boot_completed(service, BOOT_SETTLE_DELAY).await
}
