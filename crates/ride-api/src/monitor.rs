//! Handlers for the active-ride monitor.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/passengers/:id/monitor` | Select and watch the passenger's active ride |
//! | `GET`    | `/rides/:id/monitor` | Latest snapshot; 404 if not monitored |
//! | `DELETE` | `/rides/:id/monitor` | Stop; 204 |
//! | `POST`   | `/rides/:id/sos` | 202; 404 if no such ride |
//! | `POST`   | `/rides/:id/share` | 202; 404 if no such ride |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use ride_core::{ride::RideId, store::RideStore};
use ride_monitor::MonitorSnapshot;

use crate::{
  ApiState,
  error::{ApiError, store_error},
};

/// `POST /passengers/:id/monitor`
pub async fn watch<S>(
  State(state): State<ApiState<S>>,
  Path(passenger_id): Path<String>,
) -> Result<Json<MonitorSnapshot>, ApiError>
where
  S: RideStore + 'static,
{
  let snapshot = state
    .monitors
    .watch_passenger(&passenger_id)
    .await
    .map_err(store_error)?
    .ok_or_else(|| ApiError::NotFound("no active ride".into()))?;
  Ok(Json(snapshot))
}

/// `GET /rides/:id/monitor`
pub async fn snapshot<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<RideId>,
) -> Result<Json<MonitorSnapshot>, ApiError>
where
  S: RideStore + 'static,
{
  state
    .monitors
    .snapshot(&id)
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("ride {id} is not monitored")))
}

/// `DELETE /rides/:id/monitor`
pub async fn stop<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<RideId>,
) -> StatusCode
where
  S: RideStore + 'static,
{
  state.monitors.stop(&id);
  StatusCode::NO_CONTENT
}

/// `POST /rides/:id/sos`
pub async fn sos<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<RideId>,
) -> Result<StatusCode, ApiError>
where
  S: RideStore + 'static,
{
  let sent = state.monitors.sos(id.clone()).await.map_err(store_error)?;
  accepted(sent, &id)
}

/// `POST /rides/:id/share`
pub async fn share<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<RideId>,
) -> Result<StatusCode, ApiError>
where
  S: RideStore + 'static,
{
  let sent = state.monitors.share(id.clone()).await.map_err(store_error)?;
  accepted(sent, &id)
}

fn accepted(sent: bool, id: &RideId) -> Result<StatusCode, ApiError> {
  if sent {
    Ok(StatusCode::ACCEPTED)
  } else {
    Err(ApiError::NotFound(format!("ride {id} not found")))
  }
}
