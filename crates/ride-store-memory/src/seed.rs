//! Loading preset rides from a JSON file.
//!
//! The file holds a JSON array of full ride records, most recent first.

use std::path::Path;

use ride_core::ride::Ride;

use crate::{Error, Result};

/// Read and parse a seed file.
pub async fn load_seed(path: impl AsRef<Path>) -> Result<Vec<Ride>> {
  let path = path.as_ref();
  let raw = tokio::fs::read(path).await.map_err(|source| Error::SeedIo {
    path: path.to_path_buf(),
    source,
  })?;
  Ok(serde_json::from_slice(&raw)?)
}
