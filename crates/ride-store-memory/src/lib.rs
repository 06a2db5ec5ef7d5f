//! In-memory backend for the ride store.
//!
//! State lives in one process and is lost on restart. Rides can be preloaded
//! from a JSON seed file.

mod seed;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use seed::load_seed;
pub use store::MemoryStore;
