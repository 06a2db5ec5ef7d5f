//! `ride`: command-line client for the ride service.
//!
//! # Usage
//!
//! ```
//! ride --url http://localhost:8080 list --passenger p1
//! ride book --passenger p1 --pickup "MG Road" --destination Airport \
//!   --vehicle-type sedan --vehicle v1 --distance 12.5 --duration 35 --fare 500
//! ride status ride_1717… accepted --driver d1
//! ride watch p1
//! ```

mod app;
mod client;
mod ui;

use std::{io, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use app::WatchApp;
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig, ListFilter};
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use ride_core::{
  lifecycle::RideStatus,
  ride::{BookingDraft, BookingTerms, Location, Ride, RideId, RidePatch, VehicleType},
};
use serde::Deserialize;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "ride", about = "Command-line client for the ride service")]
struct Args {
  /// Path to a TOML config file (url).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the ride server (default: http://localhost:8080).
  #[arg(long, env = "RIDE_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List rides, most recent first.
  List {
    #[arg(long)]
    passenger: Option<String>,
    #[arg(long)]
    driver:    Option<String>,
    /// Restrict to these statuses (repeatable).
    #[arg(long)]
    status:    Vec<RideStatus>,
  },

  /// Show one ride.
  Show { id: RideId },

  /// Stage a booking and confirm it.
  Book {
    #[arg(long)]
    passenger:    String,
    #[arg(long)]
    pickup:       String,
    #[arg(long)]
    destination:  String,
    #[arg(long)]
    vehicle_type: VehicleType,
    #[arg(long)]
    vehicle:      String,
    #[arg(long)]
    driver:       Option<String>,
    #[arg(long)]
    distance:     f64,
    /// Estimated minutes.
    #[arg(long)]
    duration:     u32,
    #[arg(long)]
    fare:         f64,
    /// RFC 3339 pickup time for a scheduled ride.
    #[arg(long)]
    scheduled:    Option<DateTime<Utc>>,
  },

  /// Move a ride to a new status.
  Status {
    id:     RideId,
    status: RideStatus,
    /// Assign a driver in the same update.
    #[arg(long)]
    driver: Option<String>,
  },

  /// Follow a passenger's active ride live.
  Watch {
    passenger: String,
    /// Poll interval in milliseconds.
    #[arg(long, default_value_t = 1000)]
    interval:  u64,
  },

  /// Raise an emergency alert for a ride.
  Sos { id: RideId },

  /// Share a ride's live details.
  Share { id: RideId },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| "http://localhost:8080".to_string()),
  };
  let client = ApiClient::new(api_config)?;

  match args.command {
    Command::List { passenger, driver, status } => {
      let filter = ListFilter { passenger_id: passenger, driver_id: driver, statuses: status };
      let rides = client.list_rides(&filter).await?;
      if rides.is_empty() {
        println!("no rides");
      }
      for ride in &rides {
        println!("{}", summary_line(ride));
      }
    }

    Command::Show { id } => print_ride(&client.get_ride(&id).await?),

    Command::Book {
      passenger,
      pickup,
      destination,
      vehicle_type,
      vehicle,
      driver,
      distance,
      duration,
      fare,
      scheduled,
    } => {
      let draft = BookingDraft {
        pickup:         Some(Location::from_address(pickup)),
        destination:    Some(Location::from_address(destination)),
        vehicle_type:   Some(vehicle_type),
        scheduled_time: scheduled,
      };
      let terms = BookingTerms {
        passenger_id: passenger,
        driver_id: driver,
        vehicle_id: vehicle,
        distance,
        duration,
        fare,
      };
      let ride = client.book(&draft, &terms).await?;
      println!("booked {}", ride.id);
      print_ride(&ride);
    }

    Command::Status { id, status, driver } => {
      let patch = RidePatch { driver_id: driver, ..RidePatch::status(status) };
      let ride = client.update_ride(&id, &patch).await?;
      println!("{}", summary_line(&ride));
    }

    Command::Watch { passenger, interval } => {
      let app = WatchApp::new(client, passenger, Duration::from_millis(interval));
      run_watch(app).await?;
    }

    Command::Sos { id } => {
      client.sos(&id).await?;
      println!("Emergency Alert Sent. Help is on the way. Stay safe!");
    }

    Command::Share { id } => {
      client.share(&id).await?;
      println!("Ride Details Shared. Your live location has been shared");
    }
  }

  Ok(())
}

// ─── Plain output ─────────────────────────────────────────────────────────────

fn summary_line(ride: &Ride) -> String {
  format!(
    "{:<32} {:<16} {:<8} {} → {}  {:.2}",
    ride.id,
    ride.status,
    ride.vehicle_type,
    ride.pickup.address,
    ride.destination.address,
    ride.fare,
  )
}

fn print_ride(ride: &Ride) {
  let local = |at: DateTime<Utc>| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string();

  println!("id           {}", ride.id);
  println!("status       {}", ride.status);
  println!("passenger    {}", ride.passenger_id);
  println!("driver       {}", ride.driver_id.as_deref().unwrap_or("-"));
  println!("vehicle      {} ({})", ride.vehicle_id, ride.vehicle_type);
  println!("pickup       {}", ride.pickup.address);
  println!("destination  {}", ride.destination.address);
  println!("distance     {}", ride.distance);
  println!("duration     {} min", ride.duration);
  println!("fare         {:.2}", ride.fare);
  println!("created      {}", local(ride.created_at));
  if let Some(at) = ride.scheduled_time {
    println!("scheduled    {}", local(at));
  }
  if let Some(at) = ride.end_time {
    println!("ended        {}", local(at));
  }
}

// ─── Watch screen ─────────────────────────────────────────────────────────────

async fn run_watch(mut app: WatchApp) -> Result<()> {
  // Set up the terminal.
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  // Run the event loop; restore terminal even on error.
  let run_result = match app.start().await {
    Ok(()) => run_event_loop(&mut terminal, &mut app).await,
    Err(e) => Err(e),
  };

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut WatchApp,
) -> Result<()> {
  loop {
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(Event::Key(key)) = maybe_event
      && !app.handle_key(key).await?
    {
      break;
    }

    if !app.is_completed() {
      app.tick().await;
    }
  }

  Ok(())
}
