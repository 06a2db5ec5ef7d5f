//! ride-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered with
//! `RIDE_*` environment variables, builds the in-memory store and monitor
//! registry, and serves the JSON API over HTTP.
//!
//! Nested keys use a double underscore, e.g. `RIDE_MONITOR__FARE_STEP=1.0`.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use ride_api::ApiState;
use ride_monitor::{BroadcastNotifier, MonitorRegistry};
use ride_server::ServerConfig;
use ride_store_memory::MemoryStore;
use tokio::{net::TcpListener, signal};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Ride service HTTP server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("RIDE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Open the store, seeded if a seed file is configured.
  let store = match &server_cfg.seed_path {
    Some(path) => MemoryStore::open_seeded(path)
      .await
      .with_context(|| format!("failed to load seed rides from {path:?}"))?,
    None => MemoryStore::new(),
  };
  info!(rides = store.len().await, "store ready");
  let store = Arc::new(store);

  let notifier = BroadcastNotifier::new(server_cfg.notification_capacity);
  let monitors = Arc::new(MonitorRegistry::new(
    store.clone(),
    Arc::new(notifier),
    server_cfg.monitor,
  ));

  let app = ride_server::router(ApiState { store, monitors: monitors.clone() });
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  monitors.stop_all();
  info!("shut down");
  Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = signal::ctrl_c().await {
      warn!("failed to listen for Ctrl+C: {e}");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        warn!("failed to install SIGTERM handler: {e}");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => info!("received Ctrl+C, shutting down"),
    _ = terminate => info!("received terminate signal, shutting down"),
  }
}
