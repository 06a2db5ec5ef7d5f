//! HTTP server wiring for the ride service.
//!
//! Mounts the JSON API under `/api`, adds a health check and wraps the whole
//! router in request tracing.

use std::path::PathBuf;

use axum::{Json, Router, routing::get};
use ride_api::{ApiState, api_router};
use ride_core::{meter::MeterConfig, store::RideStore};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `RIDE_*` environment variables.
#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                  String,
  #[serde(default = "default_port")]
  pub port:                  u16,
  /// JSON file of rides to load at startup. Empty store when unset.
  #[serde(default)]
  pub seed_path:             Option<PathBuf>,
  /// Capacity of the notification broadcast channel.
  #[serde(default = "default_notification_capacity")]
  pub notification_capacity: usize,
  #[serde(default)]
  pub monitor:               MeterConfig,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_notification_capacity() -> usize { 64 }

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S>(state: ApiState<S>) -> Router
where
  S: RideStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

// ─── Integration tests ────────────────────────────────────────────────────────
