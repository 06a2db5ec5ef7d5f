//! State and key handling for the `watch` screen.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ride_monitor::MonitorSnapshot;

use crate::client::ApiClient;

/// Top-level state of the live ride view.
pub struct WatchApp {
  pub passenger_id: String,

  /// Latest snapshot from the server. `None` until something is being
  /// watched.
  pub snapshot: Option<MonitorSnapshot>,

  /// One-line status message shown in the status bar.
  pub status_msg: String,

  /// How often to poll the server for a fresh snapshot.
  pub poll_every: Duration,

  last_poll: Option<Instant>,
  client:    ApiClient,
}

impl WatchApp {
  pub fn new(client: ApiClient, passenger_id: String, poll_every: Duration) -> Self {
    Self {
      passenger_id,
      snapshot: None,
      status_msg: String::new(),
      poll_every,
      last_poll: None,
      client,
    }
  }

  // ── Data loading ──────────────────────────────────────────────────────────

  /// Ask the server to select and monitor the passenger's active ride.
  pub async fn start(&mut self) -> anyhow::Result<()> {
    self.status_msg = "Looking for an active ride…".into();
    self.snapshot = self.client.watch(&self.passenger_id).await?;
    self.last_poll = Some(Instant::now());
    self.status_msg = match &self.snapshot {
      Some(_) => String::new(),
      None => "No active ride".into(),
    };
    Ok(())
  }

  /// Refresh the snapshot if the poll interval has elapsed.
  pub async fn tick(&mut self) {
    if self.last_poll.is_some_and(|at| at.elapsed() < self.poll_every) {
      return;
    }
    self.last_poll = Some(Instant::now());

    let Some(id) = self.snapshot.as_ref().map(|s| s.ride_id.clone()) else {
      // Nothing yet; keep asking.
      if let Ok(snapshot) = self.client.watch(&self.passenger_id).await {
        if snapshot.is_some() {
          self.status_msg.clear();
        }
        self.snapshot = snapshot;
      }
      return;
    };

    match self.client.snapshot(&id).await {
      Ok(Some(snapshot)) => self.snapshot = Some(snapshot),
      Ok(None) => self.status_msg = "Monitor stopped".into(),
      Err(e) => self.status_msg = format!("Error: {e}"),
    }
  }

  /// Whether the watched ride has finished.
  pub fn is_completed(&self) -> bool {
    self.snapshot.as_ref().is_some_and(|s| s.completed)
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  ///
  /// A failed alert or share request is reported in the status bar and the
  /// view keeps running.
  pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return Ok(false);
    }

    let ride_id = self.snapshot.as_ref().map(|s| s.ride_id.clone());
    match key.code {
      KeyCode::Char('q') | KeyCode::Esc => return Ok(false),

      KeyCode::Char('s') => {
        if let Some(id) = ride_id {
          self.status_msg = match self.client.sos(&id).await {
            Ok(()) => "Emergency Alert Sent. Help is on the way. Stay safe!".into(),
            Err(e) => format!("Error: {e}"),
          };
        }
      }

      KeyCode::Char('h') => {
        if let Some(id) = ride_id {
          self.status_msg = match self.client.share(&id).await {
            Ok(()) => "Ride Details Shared. Your live location has been shared".into(),
            Err(e) => format!("Error: {e}"),
          };
        }
      }

      _ => {}
    }
    Ok(true)
  }
}
