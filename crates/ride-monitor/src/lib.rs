//! The active-ride monitor.
//!
//! Picks the ride a passenger is watching, runs its progress, ETA and fare
//! timers, and completes the ride when progress saturates. Each monitored
//! ride owns exactly one timer task; [`MonitorRegistry`] starts, replaces and
//! tears those tasks down.

pub mod notify;
pub mod registry;
pub mod select;
pub mod tracker;

pub use notify::{BroadcastNotifier, LogNotifier, Notification, NotificationLevel, Notifier};
pub use registry::{MonitorRegistry, RETAINED_FINAL_SNAPSHOTS};
pub use select::select_active_ride;
pub use tracker::{MonitorSnapshot, RideTracker, TickOutcome};
