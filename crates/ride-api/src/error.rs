//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<ride_core::Error> for ApiError {
  fn from(e: ride_core::Error) -> Self {
    use ride_core::Error as E;
    match e {
      E::RideNotFound(id) => ApiError::NotFound(format!("ride {id} not found")),
      e @ E::InvalidTransition { .. } => ApiError::Conflict(e.to_string()),
      e @ E::IncompleteBooking(_) => ApiError::BadRequest(e.to_string()),
      E::Store(inner) => ApiError::Store(inner),
    }
  }
}

/// Map a backend error through its domain meaning.
pub(crate) fn store_error<E: Into<ride_core::Error>>(e: E) -> ApiError {
  ApiError::from(e.into())
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
