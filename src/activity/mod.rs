//! Activity accounting for the lock coordinator.
//!
//! Tracks what the coordinator did (overlays shown, how they went away,
//! wake-lock use) so the user can see it with `goalock status`.

pub mod log;

pub use log::{
    create_shared_log, create_shared_log_with_persistence, Activity, ActivityLog, ActivityStats,
    SharedActivityLog,
};
