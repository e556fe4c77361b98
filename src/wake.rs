//! Bounded wake-lock control.
//!
//! A leaked wake lock keeps the display powered indefinitely, so every hold
//! carries a deadline no later than [`MAX_WAKE_HOLD`] and the platform lock
//! is requested with the same timeout. Holds taken on a fallible path go
//! through [`WakeGuard`], which releases on drop unless explicitly kept.

use crate::platform::{PlatformError, PowerManager};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Upper bound for any single hold.
pub const MAX_WAKE_HOLD: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Default)]
struct WakeState {
    deadline: Option<Instant>,
}

/// Idempotent acquire/release on top of the platform wake lock.
///
/// Cloning shares the same hold.
#[derive(Clone)]
pub struct WakeController {
    power: Arc<dyn PowerManager>,
    state: Arc<Mutex<WakeState>>,
}

impl WakeController {
    pub fn new(power: Arc<dyn PowerManager>) -> Self {
        Self {
            power,
            state: Arc::new(Mutex::new(WakeState::default())),
        }
    }

    /// Acquire, or refresh an existing hold, for at most `max_duration`.
    ///
    /// A refresh releases the platform lock before re-acquiring it, so the
    /// platform never sees two outstanding acquires.
    pub fn acquire(&self, max_duration: Duration) -> Result<(), PlatformError> {
        let duration = max_duration.min(MAX_WAKE_HOLD);
        let mut state = self.lock();

        if state.deadline.take().is_some() {
            if let Err(e) = self.power.release_wake_lock() {
                warn!("Wake lock release before refresh failed: {e}");
            }
            debug!("Refreshing wake lock");
        }

        self.power.acquire_wake_lock(duration)?;
        state.deadline = Some(Instant::now() + duration);
        debug!(secs = duration.as_secs(), "Wake lock held");
        Ok(())
    }

    /// Acquire and return a guard that releases on drop.
    pub fn hold(&self, max_duration: Duration) -> Result<WakeGuard, PlatformError> {
        self.acquire(max_duration)?;
        Ok(WakeGuard {
            controller: self.clone(),
            armed: true,
        })
    }

    /// Release the hold. Safe to call when nothing is held.
    pub fn release(&self) {
        let mut state = self.lock();
        if state.deadline.take().is_none() {
            return;
        }
        match self.power.release_wake_lock() {
            Ok(()) => debug!("Wake lock released"),
            Err(e) => warn!("Wake lock release failed: {e}"),
        }
    }

    /// Release the hold if its deadline has passed. Returns true if it did.
    pub fn release_if_expired(&self, now: Instant) -> bool {
        let expired = matches!(self.lock().deadline, Some(deadline) if now >= deadline);
        if expired {
            warn!("Wake lock hit its timeout, releasing");
            self.release();
        }
        expired
    }

    pub fn is_held(&self) -> bool {
        self.lock().deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.lock().deadline
    }

    fn lock(&self) -> MutexGuard<'_, WakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Releases its hold when dropped unless [`WakeGuard::keep`] was called.
pub struct WakeGuard {
    controller: WakeController,
    armed: bool,
}

impl WakeGuard {
    /// Hand the hold over to the controller. It stays bounded by its deadline.
    pub fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for WakeGuard {
    fn drop(&mut self) {
        if self.armed {
            self.controller.release();
        }
    }
}
