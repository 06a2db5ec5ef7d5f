//! Core types and trait definitions for the ride lifecycle service.
//!
//! This crate is deliberately free of HTTP and async-runtime dependencies.
//! All other crates depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod lifecycle;
pub mod meter;
pub mod ride;
pub mod store;

pub use error::{Error, Result};
