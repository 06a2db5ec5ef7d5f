//! Error types for `ride-core`.

use thiserror::Error;

use crate::{lifecycle::RideStatus, ride::RideId};

#[derive(Debug, Error)]
pub enum Error {
  #[error("ride not found: {0}")]
  RideNotFound(RideId),

  #[error("illegal status transition: {from} -> {to}")]
  InvalidTransition { from: RideStatus, to: RideStatus },

  #[error("booking is missing {0}")]
  IncompleteBooking(&'static str),

  /// A backend failure that has no domain meaning.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
