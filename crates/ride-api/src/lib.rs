//! JSON REST API for rides.
//!
//! Exposes an axum [`Router`] backed by any [`ride_core::store::RideStore`]
//! and a [`MonitorRegistry`] over the same store. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", ride_api::api_router(state))
//! ```

pub mod booking;
pub mod error;
pub mod monitor;
pub mod rides;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use ride_core::store::RideStore;
use ride_monitor::MonitorRegistry;

pub use error::ApiError;

/// Shared state threaded through every handler.
pub struct ApiState<S> {
  pub store:    Arc<S>,
  pub monitors: Arc<MonitorRegistry<S>>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), monitors: self.monitors.clone() }
  }
}

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: RideStore + 'static,
{
  Router::new()
    // Rides
    .route("/rides", get(rides::list::<S>).post(rides::create::<S>))
    .route(
      "/rides/current",
      get(rides::get_current::<S>).put(rides::set_current::<S>),
    )
    .route("/rides/{id}", get(rides::get_one::<S>).patch(rides::patch::<S>))
    // Booking
    .route("/booking", get(booking::get_draft::<S>).patch(booking::patch_draft::<S>))
    .route("/booking/confirm", post(booking::confirm::<S>))
    // Monitor
    .route("/passengers/{id}/monitor", post(monitor::watch::<S>))
    .route(
      "/rides/{id}/monitor",
      get(monitor::snapshot::<S>).delete(monitor::stop::<S>),
    )
    .route("/rides/{id}/sos", post(monitor::sos::<S>))
    .route("/rides/{id}/share", post(monitor::share::<S>))
    .with_state(state)
}
