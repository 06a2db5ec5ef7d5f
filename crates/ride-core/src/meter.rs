//! Tick arithmetic for the active-ride view: progress, ETA and fare meters.
//!
//! Nothing here knows about clocks. The monitor decides when a tick happens;
//! the meters only decide what a tick does.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::lifecycle::RideStatus;

/// Progress value at which a ride is considered arrived.
pub const PROGRESS_FULL: f64 = 100.0;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Cadences and increments for the three meters.
///
/// The defaults give a ~200 second ride, a 15 minute ETA countdown, and a
/// fare that accrues 0.5 every 2 seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
  pub progress_period_ms:  u64,
  pub progress_step:       f64,
  pub eta_period_ms:       u64,
  pub eta_initial_minutes: f64,
  pub eta_step:            f64,
  pub fare_period_ms:      u64,
  pub fare_step:           f64,
}

impl Default for MeterConfig {
  fn default() -> Self {
    Self {
      progress_period_ms:  1_000,
      progress_step:       0.5,
      eta_period_ms:       1_000,
      eta_initial_minutes: 15.0,
      eta_step:            0.25,
      fare_period_ms:      2_000,
      fare_step:           0.5,
    }
  }
}

impl MeterConfig {
  pub fn progress_period(&self) -> Duration {
    Duration::from_millis(self.progress_period_ms)
  }

  pub fn eta_period(&self) -> Duration { Duration::from_millis(self.eta_period_ms) }

  pub fn fare_period(&self) -> Duration { Duration::from_millis(self.fare_period_ms) }
}

// ─── Meters ──────────────────────────────────────────────────────────────────

/// Counter state for one watched ride.
#[derive(Debug, Clone)]
pub struct Meters {
  config:       MeterConfig,
  progress:     f64,
  eta_minutes:  f64,
  fare_accrued: f64,
  arrived:      bool,
}

impl Meters {
  pub fn new(config: MeterConfig) -> Self {
    Self {
      config,
      progress: 0.0,
      eta_minutes: config.eta_initial_minutes,
      fare_accrued: 0.0,
      arrived: false,
    }
  }

  /// Advance progress by one step, saturating at [`PROGRESS_FULL`].
  ///
  /// Returns `true` on exactly one call: the one where progress first
  /// reaches full. Every later call returns `false`.
  pub fn tick_progress(&mut self) -> bool {
    if self.arrived {
      return false;
    }
    self.progress = (self.progress + self.config.progress_step).min(PROGRESS_FULL);
    if self.progress >= PROGRESS_FULL {
      self.arrived = true;
      return true;
    }
    false
  }

  /// Count the ETA down by one step, floored at zero.
  pub fn tick_eta(&mut self) {
    self.eta_minutes = (self.eta_minutes - self.config.eta_step).max(0.0);
  }

  /// Accrue one fare step.
  pub fn tick_fare(&mut self) { self.fare_accrued += self.config.fare_step; }

  pub fn progress(&self) -> f64 { self.progress }

  pub fn arrived(&self) -> bool { self.arrived }

  pub fn eta_minutes(&self) -> f64 { self.eta_minutes }

  /// Whole minutes for display: rounded up, never negative.
  pub fn eta_display_minutes(&self) -> u32 { self.eta_minutes.max(0.0).ceil() as u32 }

  pub fn fare_accrued(&self) -> f64 { self.fare_accrued }

  /// The fare to show for a ride booked at `booked_fare` in `status`.
  pub fn display_fare(&self, booked_fare: f64, status: RideStatus) -> f64 {
    display_fare(booked_fare, self.fare_accrued, status)
  }
}

/// Estimated fare while riding: starts at half the booked fare and climbs
/// with `accrued`, capped at the booked fare. Outside `in_progress` the
/// booked fare is shown as is.
pub fn display_fare(booked_fare: f64, accrued: f64, status: RideStatus) -> f64 {
  if status == RideStatus::InProgress {
    booked_fare.min(booked_fare * 0.5 + accrued)
  } else {
    booked_fare
  }
}
