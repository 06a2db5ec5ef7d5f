//! Handlers for `/booking` endpoints.
//!
//! The draft is staged field by field with `PATCH` and turned into a ride
//! with `POST /booking/confirm`.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use ride_core::{
  ride::{BookingDraft, BookingTerms, NewRide},
  store::RideStore,
};

use crate::{
  ApiState,
  error::{ApiError, store_error},
};

/// `GET /booking`
pub async fn get_draft<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<BookingDraft>, ApiError>
where
  S: RideStore + 'static,
{
  let draft = state.store.booking_draft().await.map_err(store_error)?;
  Ok(Json(draft))
}

/// `PATCH /booking`, body: any subset of the draft fields.
pub async fn patch_draft<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<BookingDraft>,
) -> Result<Json<BookingDraft>, ApiError>
where
  S: RideStore + 'static,
{
  let draft = state.store.set_booking_data(body).await.map_err(store_error)?;
  Ok(Json(draft))
}

/// `POST /booking/confirm`, body: [`BookingTerms`].
pub async fn confirm<S>(
  State(state): State<ApiState<S>>,
  Json(terms): Json<BookingTerms>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RideStore + 'static,
{
  let draft = state.store.booking_draft().await.map_err(store_error)?;
  let input = NewRide::from_draft(&draft, terms)?;
  let ride = state.store.create_ride(input).await.map_err(store_error)?;
  Ok((StatusCode::CREATED, Json(ride)))
}
