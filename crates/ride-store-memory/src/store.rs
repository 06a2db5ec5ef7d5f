//! [`MemoryStore`]: the in-memory implementation of [`RideStore`].

use std::{
  collections::{HashMap, VecDeque},
  path::Path,
  sync::Arc,
};

use chrono::{DateTime, Utc};
use ride_core::{
  ride::{BookingDraft, NewRide, Ride, RideId, RidePatch},
  store::{RideQuery, RideStore},
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{Error, Result, seed::load_seed};

// ─── Table ───────────────────────────────────────────────────────────────────

/// Everything the store owns, guarded by one lock.
#[derive(Debug, Default)]
struct Table {
  rides:   HashMap<RideId, Ride>,
  /// Ride ids, most recent first.
  order:   VecDeque<RideId>,
  /// Resolved against `rides` on every read.
  current: Option<RideId>,
  draft:   BookingDraft,
}

impl Table {
  /// Clear the pointer if it names `id`.
  fn release(&mut self, id: &RideId) -> bool {
    if self.current.as_ref() == Some(id) {
      self.current = None;
      return true;
    }
    false
  }

  fn ordered(&self) -> impl Iterator<Item = &Ride> {
    self.order.iter().filter_map(|id| self.rides.get(id))
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A ride store held entirely in process memory.
///
/// Cloning is cheap; clones share the same table.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
  table: Arc<RwLock<Table>>,
}

impl MemoryStore {
  /// An empty store.
  pub fn new() -> Self { Self::default() }

  /// A store preloaded with `rides`, kept in the given order (most recent
  /// first). Later duplicates of an id are dropped.
  pub fn with_rides(rides: impl IntoIterator<Item = Ride>) -> Self {
    let mut table = Table::default();
    for ride in rides {
      if table.rides.contains_key(&ride.id) {
        warn!(ride_id = %ride.id, "dropping duplicate seed ride");
        continue;
      }
      table.order.push_back(ride.id.clone());
      table.rides.insert(ride.id.clone(), ride);
    }
    Self { table: Arc::new(RwLock::new(table)) }
  }

  /// Build a store from a JSON seed file (see [`crate::load_seed`]).
  pub async fn open_seeded(path: impl AsRef<Path>) -> Result<Self> {
    let rides = load_seed(path).await?;
    info!(count = rides.len(), "loaded seed rides");
    Ok(Self::with_rides(rides))
  }

  /// Number of stored rides.
  pub async fn len(&self) -> usize { self.table.read().await.rides.len() }
}

// ─── RideStore impl ──────────────────────────────────────────────────────────

impl RideStore for MemoryStore {
  type Error = Error;

  // ── Booking draft ─────────────────────────────────────────────────────────

  async fn set_booking_data(&self, patch: BookingDraft) -> Result<BookingDraft> {
    let mut table = self.table.write().await;
    table.draft.merge(patch);
    Ok(table.draft.clone())
  }

  async fn booking_draft(&self) -> Result<BookingDraft> {
    Ok(self.table.read().await.draft.clone())
  }

  // ── Rides ─────────────────────────────────────────────────────────────────

  async fn create_ride(&self, input: NewRide) -> Result<Ride> {
    let ride = Ride::new(input);

    let mut table = self.table.write().await;
    table.order.push_front(ride.id.clone());
    table.rides.insert(ride.id.clone(), ride.clone());
    table.current = Some(ride.id.clone());

    info!(ride_id = %ride.id, passenger_id = %ride.passenger_id, "ride created");
    Ok(ride)
  }

  async fn update_ride(&self, id: RideId, patch: RidePatch) -> Result<Ride> {
    let mut table = self.table.write().await;
    let ride = table
      .rides
      .get_mut(&id)
      .ok_or_else(|| Error::RideNotFound(id.clone()))?;

    ride.apply(&patch)?;

    debug!(ride_id = %id, status = %ride.status, "ride updated");
    Ok(ride.clone())
  }

  async fn get_ride(&self, id: RideId) -> Result<Option<Ride>> {
    Ok(self.table.read().await.rides.get(&id).cloned())
  }

  async fn list_rides(&self, query: RideQuery) -> Result<Vec<Ride>> {
    let table = self.table.read().await;
    Ok(table.ordered().filter(|r| query.matches(r)).cloned().collect())
  }

  // ── Current ride ──────────────────────────────────────────────────────────

  async fn set_current_ride(&self, id: Option<RideId>) -> Result<Option<Ride>> {
    let mut table = self.table.write().await;
    let resolved = match id {
      Some(id) => {
        let ride = table
          .rides
          .get(&id)
          .cloned()
          .ok_or(Error::RideNotFound(id))?;
        Some(ride)
      }
      None => None,
    };
    table.current = resolved.as_ref().map(|r| r.id.clone());
    Ok(resolved)
  }

  async fn current_ride(&self) -> Result<Option<Ride>> {
    let table = self.table.read().await;
    Ok(table.current.as_ref().and_then(|id| table.rides.get(id)).cloned())
  }

  async fn release_current_ride(&self, id: RideId) -> Result<bool> {
    Ok(self.table.write().await.release(&id))
  }

  async fn complete_ride(&self, id: RideId, at: DateTime<Utc>) -> Result<Ride> {
    let mut table = self.table.write().await;
    let ride = table
      .rides
      .get_mut(&id)
      .ok_or_else(|| Error::RideNotFound(id.clone()))?;
    ride.apply(&RidePatch::completion(at))?;
    let ride = ride.clone();
    table.release(&id);

    info!(ride_id = %id, "ride completed");
    Ok(ride)
  }
}
