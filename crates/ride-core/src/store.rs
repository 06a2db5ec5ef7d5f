//! The `RideStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `ride-store-memory`).
//! Higher layers (`ride-monitor`, `ride-api`) depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  lifecycle::RideStatus,
  ride::{BookingDraft, NewRide, Ride, RideId, RidePatch},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`RideStore::list_rides`]. Every set field must match.
#[derive(Debug, Clone, Default)]
pub struct RideQuery {
  pub passenger_id: Option<String>,
  pub driver_id:    Option<String>,
  /// If non-empty, the ride's status must be one of these.
  pub statuses:     Vec<RideStatus>,
}

impl RideQuery {
  pub fn passenger(passenger_id: impl Into<String>) -> Self {
    Self { passenger_id: Some(passenger_id.into()), ..Self::default() }
  }

  pub fn driver(driver_id: impl Into<String>) -> Self {
    Self { driver_id: Some(driver_id.into()), ..Self::default() }
  }

  pub fn matches(&self, ride: &Ride) -> bool {
    self
      .passenger_id
      .as_ref()
      .is_none_or(|p| *p == ride.passenger_id)
      && self
        .driver_id
        .as_ref()
        .is_none_or(|d| ride.driver_id.as_ref() == Some(d))
      && (self.statuses.is_empty() || self.statuses.contains(&ride.status))
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a ride store backend.
///
/// The store owns every ride record plus two pieces of per-process state: the
/// current-ride pointer (held as an id and resolved on read, so it can never
/// disagree with the record it names) and the booking draft.
///
/// Listing methods return rides most-recent-first. Rides are never deleted.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RideStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Booking draft ─────────────────────────────────────────────────────

  /// Merge the set fields of `patch` into the draft and return the result.
  fn set_booking_data(
    &self,
    patch: BookingDraft,
  ) -> impl Future<Output = Result<BookingDraft, Self::Error>> + Send + '_;

  fn booking_draft(
    &self,
  ) -> impl Future<Output = Result<BookingDraft, Self::Error>> + Send + '_;

  // ── Rides ─────────────────────────────────────────────────────────────

  /// Persist a new `pending` ride, put it at the front of the list, and make
  /// it the current ride. Input is not validated.
  fn create_ride(
    &self,
    input: NewRide,
  ) -> impl Future<Output = Result<Ride, Self::Error>> + Send + '_;

  /// Shallow-merge `patch` into the ride with `id` and return the result.
  ///
  /// Returns a not-found error if no such ride exists, and an
  /// invalid-transition error if the patch moves the status illegally. In
  /// both cases nothing changes.
  fn update_ride(
    &self,
    id: RideId,
    patch: RidePatch,
  ) -> impl Future<Output = Result<Ride, Self::Error>> + Send + '_;

  /// Retrieve a ride by id. Returns `None` if not found.
  fn get_ride(
    &self,
    id: RideId,
  ) -> impl Future<Output = Result<Option<Ride>, Self::Error>> + Send + '_;

  /// All rides matching `query`, most-recent-first.
  fn list_rides(
    &self,
    query: RideQuery,
  ) -> impl Future<Output = Result<Vec<Ride>, Self::Error>> + Send + '_;

  /// Rides booked by `passenger_id`, most-recent-first.
  fn user_rides(
    &self,
    passenger_id: String,
  ) -> impl Future<Output = Result<Vec<Ride>, Self::Error>> + Send + '_ {
    self.list_rides(RideQuery::passenger(passenger_id))
  }

  /// Rides assigned to `driver_id`, most-recent-first.
  fn driver_rides(
    &self,
    driver_id: String,
  ) -> impl Future<Output = Result<Vec<Ride>, Self::Error>> + Send + '_ {
    self.list_rides(RideQuery::driver(driver_id))
  }

  // ── Current ride ──────────────────────────────────────────────────────

  /// Point the current ride at `id`, or clear it with `None`.
  ///
  /// Returns a not-found error, leaving the pointer alone, if `id` names no
  /// stored ride.
  fn set_current_ride(
    &self,
    id: Option<RideId>,
  ) -> impl Future<Output = Result<Option<Ride>, Self::Error>> + Send + '_;

  /// Resolve the current-ride pointer.
  fn current_ride(
    &self,
  ) -> impl Future<Output = Result<Option<Ride>, Self::Error>> + Send + '_;

  /// Clear the pointer only if it currently names `id`. Returns whether it
  /// was cleared.
  fn release_current_ride(
    &self,
    id: RideId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Mark ride `id` completed at `at` and release the current-ride pointer
  /// if it names `id`, as one atomic step.
  ///
  /// Fails like [`RideStore::update_ride`] and then changes nothing.
  fn complete_ride(
    &self,
    id: RideId,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Ride, Self::Error>> + Send + '_;
}
