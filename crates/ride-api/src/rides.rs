//! Handlers for `/rides` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/rides` | Optional `?passenger_id`, `?driver_id`, `?status=a,b` |
//! | `POST`  | `/rides` | Body: [`NewRide`]; returns 201 + stored ride |
//! | `GET`   | `/rides/:id` | 404 if not found |
//! | `PATCH` | `/rides/:id` | Body: [`RidePatch`]; 404 unknown, 409 illegal transition |
//! | `GET`   | `/rides/current` | 404 if no current ride |
//! | `PUT`   | `/rides/current` | Body: `{"ride_id": "..."}` or `{"ride_id": null}` |

use std::str::FromStr;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use ride_core::{
  lifecycle::RideStatus,
  ride::{NewRide, Ride, RideId, RidePatch},
  store::{RideQuery, RideStore},
};
use serde::Deserialize;

use crate::{
  ApiState,
  error::{ApiError, store_error},
};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub passenger_id: Option<String>,
  pub driver_id:    Option<String>,
  /// Comma-separated statuses, e.g. `pending,accepted`.
  pub status:       Option<String>,
}

impl ListParams {
  fn into_query(self) -> Result<RideQuery, ApiError> {
    let statuses = match self.status.as_deref() {
      None | Some("") => Vec::new(),
      Some(list) => list
        .split(',')
        .map(str::trim)
        .map(|s| {
          RideStatus::from_str(s)
            .map_err(|_| ApiError::BadRequest(format!("unknown status `{s}`")))
        })
        .collect::<Result<_, _>>()?,
    };
    Ok(RideQuery {
      passenger_id: self.passenger_id,
      driver_id: self.driver_id,
      statuses,
    })
  }
}

/// `GET /rides[?passenger_id=..][&driver_id=..][&status=..]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Ride>>, ApiError>
where
  S: RideStore + 'static,
{
  let query = params.into_query()?;
  let rides = state.store.list_rides(query).await.map_err(store_error)?;
  Ok(Json(rides))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /rides`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewRide>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RideStore + 'static,
{
  let ride = state.store.create_ride(body).await.map_err(store_error)?;
  Ok((StatusCode::CREATED, Json(ride)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /rides/:id`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<RideId>,
) -> Result<Json<Ride>, ApiError>
where
  S: RideStore + 'static,
{
  let ride = state
    .store
    .get_ride(id.clone())
    .await
    .map_err(store_error)?
    .ok_or_else(|| ApiError::NotFound(format!("ride {id} not found")))?;
  Ok(Json(ride))
}

// ─── Patch ────────────────────────────────────────────────────────────────────

/// `PATCH /rides/:id`
pub async fn patch<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<RideId>,
  Json(body): Json<RidePatch>,
) -> Result<Json<Ride>, ApiError>
where
  S: RideStore + 'static,
{
  let ride = state.store.update_ride(id, body).await.map_err(store_error)?;
  Ok(Json(ride))
}

// ─── Current ride ─────────────────────────────────────────────────────────────

/// `GET /rides/current`
pub async fn get_current<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Ride>, ApiError>
where
  S: RideStore + 'static,
{
  let ride = state
    .store
    .current_ride()
    .await
    .map_err(store_error)?
    .ok_or_else(|| ApiError::NotFound("no current ride".into()))?;
  Ok(Json(ride))
}

#[derive(Debug, Deserialize)]
pub struct SetCurrentBody {
  pub ride_id: Option<RideId>,
}

/// `PUT /rides/current`. Returns the new current ride, or 204 when cleared.
pub async fn set_current<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<SetCurrentBody>,
) -> Result<axum::response::Response, ApiError>
where
  S: RideStore + 'static,
{
  let current = state
    .store
    .set_current_ride(body.ride_id)
    .await
    .map_err(store_error)?;
  Ok(match current {
    Some(ride) => Json(ride).into_response(),
    None => StatusCode::NO_CONTENT.into_response(),
  })
}
