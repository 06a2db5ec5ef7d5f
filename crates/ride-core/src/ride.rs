//! Ride records and the inputs that create and modify them.
//!
//! A ride is created once with `pending` status, patched any number of times,
//! and never deleted. Termination is a status value.

use std::fmt;

use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore as _};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Error, Result, lifecycle::RideStatus};

// ─── Identity ────────────────────────────────────────────────────────────────

const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque ride identifier of the form `ride_<unix millis><9 base36 chars>`.
///
/// Uniqueness is best-effort: two ids generated in the same millisecond only
/// differ by their random suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RideId(String);

impl RideId {
  /// Generate a fresh id from the wall clock and the OS random source.
  pub fn generate() -> Self {
    let millis = Utc::now().timestamp_millis();
    let mut bits = OsRng.next_u64();
    let mut suffix = String::with_capacity(ID_SUFFIX_LEN);
    for _ in 0..ID_SUFFIX_LEN {
      suffix.push(BASE36[(bits % 36) as usize] as char);
      bits /= 36;
    }
    Self(format!("ride_{millis}{suffix}"))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for RideId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<String> for RideId {
  fn from(s: String) -> Self { Self(s) }
}

impl From<&str> for RideId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

// ─── Geography ───────────────────────────────────────────────────────────────

/// A pickup or drop-off point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
  pub address: String,
  #[serde(default)]
  pub lat:     f64,
  #[serde(default)]
  pub lng:     f64,
}

impl Location {
  /// A location known only by its address.
  pub fn from_address(address: impl Into<String>) -> Self {
    Self { address: address.into(), lat: 0.0, lng: 0.0 }
  }
}

// ─── Vehicle ─────────────────────────────────────────────────────────────────

/// The class of vehicle a ride was booked for.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VehicleType {
  Bike,
  Auto,
  Mini,
  Sedan,
  Suv,
  Premium,
}

// ─── Ride ────────────────────────────────────────────────────────────────────

/// The central record. `fare` is fixed at booking; any fare shown while the
/// ride is in progress is a display estimate derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ride {
  pub id:             RideId,
  pub passenger_id:   String,
  /// `None` until a driver is assigned.
  pub driver_id:      Option<String>,
  pub vehicle_id:     String,
  pub vehicle_type:   VehicleType,
  pub pickup:         Location,
  pub destination:    Location,
  pub distance:       f64,
  /// Estimated trip duration in minutes.
  pub duration:       u32,
  pub fare:           f64,
  pub status:         RideStatus,
  #[serde(default)]
  pub scheduled_time: Option<DateTime<Utc>>,
  /// Server-assigned; never changes after creation.
  pub created_at:     DateTime<Utc>,
  #[serde(default)]
  pub end_time:       Option<DateTime<Utc>>,
}

impl Ride {
  /// Materialise a new `pending` ride from booking input.
  pub fn new(input: NewRide) -> Self {
    Self {
      id:             RideId::generate(),
      passenger_id:   input.passenger_id,
      driver_id:      input.driver_id,
      vehicle_id:     input.vehicle_id,
      vehicle_type:   input.vehicle_type,
      pickup:         input.pickup,
      destination:    input.destination,
      distance:       input.distance,
      duration:       input.duration,
      fare:           input.fare,
      status:         RideStatus::Pending,
      scheduled_time: input.scheduled_time,
      created_at:     Utc::now(),
      end_time:       None,
    }
  }

  /// Shallow-merge `patch` into this ride.
  ///
  /// A status change is checked against the lifecycle first; an illegal one
  /// leaves the ride untouched.
  pub fn apply(&mut self, patch: &RidePatch) -> Result<()> {
    if let Some(next) = patch.status
      && !self.status.can_transition_to(next)
    {
      return Err(Error::InvalidTransition { from: self.status, to: next });
    }

    if let Some(status) = patch.status {
      self.status = status;
    }
    if let Some(driver_id) = &patch.driver_id {
      self.driver_id = Some(driver_id.clone());
    }
    if let Some(vehicle_id) = &patch.vehicle_id {
      self.vehicle_id = vehicle_id.clone();
    }
    if let Some(vehicle_type) = patch.vehicle_type {
      self.vehicle_type = vehicle_type;
    }
    if let Some(pickup) = &patch.pickup {
      self.pickup = pickup.clone();
    }
    if let Some(destination) = &patch.destination {
      self.destination = destination.clone();
    }
    if let Some(distance) = patch.distance {
      self.distance = distance;
    }
    if let Some(duration) = patch.duration {
      self.duration = duration;
    }
    if let Some(fare) = patch.fare {
      self.fare = fare;
    }
    if let Some(end_time) = patch.end_time {
      self.end_time = Some(end_time);
    }
    Ok(())
  }
}

// ─── NewRide ─────────────────────────────────────────────────────────────────

/// Input to [`crate::store::RideStore::create_ride`].
/// `id`, `status` and `created_at` are always set by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRide {
  pub passenger_id:   String,
  #[serde(default)]
  pub driver_id:      Option<String>,
  pub vehicle_id:     String,
  pub vehicle_type:   VehicleType,
  pub pickup:         Location,
  pub destination:    Location,
  pub distance:       f64,
  pub duration:       u32,
  pub fare:           f64,
  #[serde(default)]
  pub scheduled_time: Option<DateTime<Utc>>,
}

/// Everything a booking needs beyond what the draft collects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingTerms {
  pub passenger_id: String,
  #[serde(default)]
  pub driver_id:    Option<String>,
  pub vehicle_id:   String,
  pub distance:     f64,
  pub duration:     u32,
  pub fare:         f64,
}

impl NewRide {
  /// Combine a staged draft with quoted terms.
  ///
  /// Fails with [`Error::IncompleteBooking`] naming the first draft field
  /// that was never staged.
  pub fn from_draft(draft: &BookingDraft, terms: BookingTerms) -> Result<Self> {
    let pickup = draft.pickup.clone().ok_or(Error::IncompleteBooking("pickup"))?;
    let destination = draft
      .destination
      .clone()
      .ok_or(Error::IncompleteBooking("destination"))?;
    let vehicle_type = draft
      .vehicle_type
      .ok_or(Error::IncompleteBooking("vehicle_type"))?;

    Ok(Self {
      passenger_id: terms.passenger_id,
      driver_id: terms.driver_id,
      vehicle_id: terms.vehicle_id,
      vehicle_type,
      pickup,
      destination,
      distance: terms.distance,
      duration: terms.duration,
      fare: terms.fare,
      scheduled_time: draft.scheduled_time,
    })
  }
}

// ─── RidePatch ───────────────────────────────────────────────────────────────

/// A partial update. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RidePatch {
  pub status:       Option<RideStatus>,
  pub driver_id:    Option<String>,
  pub vehicle_id:   Option<String>,
  pub vehicle_type: Option<VehicleType>,
  pub pickup:       Option<Location>,
  pub destination:  Option<Location>,
  pub distance:     Option<f64>,
  pub duration:     Option<u32>,
  pub fare:         Option<f64>,
  pub end_time:     Option<DateTime<Utc>>,
}

impl RidePatch {
  pub fn status(status: RideStatus) -> Self {
    Self { status: Some(status), ..Self::default() }
  }

  /// The patch the monitor writes when progress saturates.
  pub fn completion(at: DateTime<Utc>) -> Self {
    Self {
      status: Some(RideStatus::Completed),
      end_time: Some(at),
      ..Self::default()
    }
  }
}

// ─── BookingDraft ────────────────────────────────────────────────────────────

/// Transient staging area for a booking in progress. Every field is
/// optional; the draft is merged field-by-field and never validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingDraft {
  pub pickup:         Option<Location>,
  pub destination:    Option<Location>,
  pub vehicle_type:   Option<VehicleType>,
  pub scheduled_time: Option<DateTime<Utc>>,
}

impl BookingDraft {
  /// Overwrite the fields that `patch` sets; keep the rest.
  pub fn merge(&mut self, patch: BookingDraft) {
    if patch.pickup.is_some() {
      self.pickup = patch.pickup;
    }
    if patch.destination.is_some() {
      self.destination = patch.destination;
    }
    if patch.vehicle_type.is_some() {
      self.vehicle_type = patch.vehicle_type;
    }
    if patch.scheduled_time.is_some() {
      self.scheduled_time = patch.scheduled_time;
    }
  }
}
