//! Choosing which ride a passenger's active-ride view follows.

use ride_core::{
  lifecycle::RideStatus,
  ride::Ride,
  store::{RideQuery, RideStore},
};

/// The ride `passenger_id` should be watching, if any.
///
/// The store's current ride wins when it belongs to the passenger. Otherwise
/// the most recent of the passenger's rides that is still pending or under
/// way. `None` is a normal outcome: the passenger has nothing to watch.
pub async fn select_active_ride<S: RideStore>(
  store: &S,
  passenger_id: &str,
) -> Result<Option<Ride>, S::Error> {
  if let Some(current) = store.current_ride().await?
    && current.passenger_id == passenger_id
  {
    return Ok(Some(current));
  }

  let query = RideQuery {
    statuses: RideStatus::ACTIVE.to_vec(),
    ..RideQuery::passenger(passenger_id)
  };
  Ok(store.list_rides(query).await?.into_iter().next())
}
