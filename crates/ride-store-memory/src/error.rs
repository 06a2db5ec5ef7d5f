//! Error type for `ride-store-memory`.

use std::path::PathBuf;

use ride_core::ride::RideId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] ride_core::Error),

  #[error("ride not found: {0}")]
  RideNotFound(RideId),

  #[error("failed to read seed file {path:?}: {source}")]
  SeedIo {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("seed file is not valid ride JSON: {0}")]
  SeedJson(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for ride_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(inner) => inner,
      Error::RideNotFound(id) => ride_core::Error::RideNotFound(id),
      other => ride_core::Error::Store(Box::new(other)),
    }
  }
}
