//! Counters of coordinator activity, optionally persisted between runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Something the coordinator did that is worth counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    OverlayShown,
    SwipeDismissal,
    /// Overlay retracted because the keyguard was unlocked
    UnlockDismissal,
    ScreenOffRetraction,
    WakeAcquisition,
    /// Wake lock released by its deadline instead of a transition
    WakeTimeout,
    PresentationFailure,
}

impl Activity {
    pub const ALL: [Activity; 7] = [
        Activity::OverlayShown,
        Activity::SwipeDismissal,
        Activity::UnlockDismissal,
        Activity::ScreenOffRetraction,
        Activity::WakeAcquisition,
        Activity::WakeTimeout,
        Activity::PresentationFailure,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Activity counters for the current and previous sessions.
#[derive(Debug)]
pub struct ActivityLog {
    counts: [AtomicU64; Activity::ALL.len()],
    session_start: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            counts: Default::default(),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log that loads from and saves to `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            warn!("Could not load previous activity stats: {e}");
        }

        log
    }

    pub fn record(&self, activity: Activity) {
        self.counts[activity.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self, activity: Activity) -> u64 {
        self.counts[activity.index()].load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> ActivityStats {
        ActivityStats {
            overlays_shown: self.count(Activity::OverlayShown),
            swipe_dismissals: self.count(Activity::SwipeDismissal),
            unlock_dismissals: self.count(Activity::UnlockDismissal),
            screen_off_retractions: self.count(Activity::ScreenOffRetraction),
            wake_acquisitions: self.count(Activity::WakeAcquisition),
            wake_timeouts: self.count(Activity::WakeTimeout),
            presentation_failures: self.count(Activity::PresentationFailure),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Activity:\n\
             - Overlays shown: {}\n\
             - Dismissed by swipe: {}\n\
             - Dismissed by unlock: {}\n\
             - Retracted on screen off: {}\n\
             - Wake locks acquired: {} ({} timed out)\n\
             - Presentation failures: {}\n\
             - Session duration: {} seconds",
            stats.overlays_shown,
            stats.swipe_dismissals,
            stats.unlock_dismissals,
            stats.screen_off_retractions,
            stats.wake_acquisitions,
            stats.wake_timeouts,
            stats.presentation_failures,
            stats.session_duration_secs
        )
    }

    /// Save counters to disk, if this log is persistent.
    ///
    /// The file is replaced atomically, so a crash mid-write keeps the previous copy.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let Some(path) = self.persist_path.as_ref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let persisted = PersistedActivity {
            counts: Activity::ALL.iter().map(|&a| (a, self.count(a))).collect(),
            last_updated: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        let Some(path) = self.persist_path.as_ref() else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }

        let content = std::fs::read_to_string(path)?;
        let persisted: PersistedActivity =
            serde_json::from_str(&content).map_err(std::io::Error::other)?;
        for (activity, count) in persisted.counts {
            self.counts[activity.index()].store(count, Ordering::Relaxed);
        }
        Ok(())
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of activity counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityStats {
    pub overlays_shown: u64,
    pub swipe_dismissals: u64,
    pub unlock_dismissals: u64,
    pub screen_off_retractions: u64,
    pub wake_acquisitions: u64,
    pub wake_timeouts: u64,
    pub presentation_failures: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedActivity {
    counts: BTreeMap<Activity, u64>,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared activity log.
pub type SharedActivityLog = Arc<ActivityLog>;

pub fn create_shared_log() -> SharedActivityLog {
    Arc::new(ActivityLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedActivityLog {
    Arc::new(ActivityLog::with_persistence(path))
}
