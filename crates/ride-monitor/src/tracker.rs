//! [`RideTracker`]: meter state for one watched ride and what each tick does
//! to it.
//!
//! The tracker has no clock of its own. The registry's task calls the
//! `on_*_tick` methods on its timers; tests call them directly.

use std::sync::Arc;

use chrono::Utc;
use ride_core::{
  lifecycle::{RideStatus, Stage, stages},
  meter::{MeterConfig, Meters},
  ride::{Ride, RideId},
  store::RideStore,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::notify::{Notification, Notifier};

/// What a progress tick led to.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
  /// Still under way.
  Running,
  /// Progress saturated on this tick and the ride was completed.
  Completed(Ride),
  /// The ride was finished or removed by someone else; nothing more to do.
  Ended,
}

/// Point-in-time view of a monitored ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
  pub ride_id:      RideId,
  pub passenger_id: String,
  pub status:       RideStatus,
  pub headline:     String,
  /// 0 to 100.
  pub progress:     f64,
  /// Whole minutes, rounded up.
  pub eta_minutes:  u32,
  /// Fare to display; an estimate while the ride is in progress.
  pub fare:         f64,
  pub booked_fare:  f64,
  pub stages:       Vec<Stage>,
  pub completed:    bool,
}

/// Meter state plus the last known copy of the ride.
pub struct RideTracker<S> {
  store:    Arc<S>,
  notifier: Arc<dyn Notifier>,
  meters:   Meters,
  ride:     Ride,
  finished: bool,
}

impl<S: RideStore> RideTracker<S> {
  pub fn new(
    store: Arc<S>,
    notifier: Arc<dyn Notifier>,
    config: MeterConfig,
    ride: Ride,
  ) -> Self {
    Self { store, notifier, meters: Meters::new(config), ride, finished: false }
  }

  pub fn ride_id(&self) -> &RideId { &self.ride.id }

  /// `true` once the tracker has completed the ride or seen it end.
  pub fn is_finished(&self) -> bool { self.finished }

  /// Pull the latest copy of the ride. Returns `false` if it is gone.
  async fn refresh(&mut self) -> Result<bool, S::Error> {
    match self.store.get_ride(self.ride.id.clone()).await? {
      Some(ride) => {
        self.ride = ride;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  /// Advance progress. On the tick that saturates it, mark the ride
  /// completed, release the current-ride pointer, and notify the passenger.
  /// This happens at most once per tracker.
  pub async fn on_progress_tick(&mut self) -> Result<TickOutcome, S::Error> {
    if self.finished {
      return Ok(TickOutcome::Ended);
    }
    if !self.refresh().await? || self.ride.status.is_terminal() {
      debug!(ride_id = %self.ride.id, "ride ended outside the monitor");
      self.finished = true;
      return Ok(TickOutcome::Ended);
    }

    if !self.meters.tick_progress() {
      return Ok(TickOutcome::Running);
    }

    self.finished = true;
    let id = self.ride.id.clone();
    // Nothing may await between the store write and the notification.
    let ride = self.store.complete_ride(id.clone(), Utc::now()).await?;
    self.ride = ride.clone();

    info!(ride_id = %id, "monitor completed ride");
    self.notifier.notify(Notification::ride_completed(id));
    Ok(TickOutcome::Completed(ride))
  }

  /// Count the ETA down. Cosmetic only.
  pub fn on_eta_tick(&mut self) {
    if !self.finished {
      self.meters.tick_eta();
    }
  }

  /// Accrue fare while the ride is in progress.
  pub async fn on_fare_tick(&mut self) -> Result<(), S::Error> {
    if self.finished || !self.refresh().await? {
      return Ok(());
    }
    if self.ride.status == RideStatus::InProgress {
      self.meters.tick_fare();
    }
    Ok(())
  }

  pub fn snapshot(&self) -> MonitorSnapshot {
    let status = self.ride.status;
    MonitorSnapshot {
      ride_id:      self.ride.id.clone(),
      passenger_id: self.ride.passenger_id.clone(),
      status,
      headline:     status.headline().to_owned(),
      progress:     self.meters.progress(),
      eta_minutes:  self.meters.eta_display_minutes(),
      fare:         self.meters.display_fare(self.ride.fare, status),
      booked_fare:  self.ride.fare,
      stages:       stages(status).to_vec(),
      completed:    status == RideStatus::Completed,
    }
  }
}
