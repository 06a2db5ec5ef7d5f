//! User-facing notifications raised by the monitor.

use ride_core::ride::RideId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// How a notification should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
  Success,
  Alert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  pub ride_id: RideId,
  pub level:   NotificationLevel,
  pub title:   String,
  pub message: String,
}

impl Notification {
  pub fn ride_completed(ride_id: RideId) -> Self {
    Self {
      ride_id,
      level: NotificationLevel::Success,
      title: "Ride Completed!".into(),
      message: "Thank you for riding with us".into(),
    }
  }

  pub fn sos(ride_id: RideId) -> Self {
    Self {
      ride_id,
      level: NotificationLevel::Alert,
      title: "Emergency Alert Sent".into(),
      message: "Help is on the way. Stay safe!".into(),
    }
  }

  pub fn shared(ride_id: RideId) -> Self {
    Self {
      ride_id,
      level: NotificationLevel::Success,
      title: "Ride Details Shared".into(),
      message: "Your live location has been shared".into(),
    }
  }
}

/// Somewhere to send notifications. Delivery is fire-and-forget.
pub trait Notifier: Send + Sync + 'static {
  fn notify(&self, notification: Notification);
}

/// Writes every notification to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn notify(&self, n: Notification) {
    match n.level {
      NotificationLevel::Success => {
        info!(ride_id = %n.ride_id, title = %n.title, "{}", n.message)
      }
      NotificationLevel::Alert => {
        warn!(ride_id = %n.ride_id, title = %n.title, "{}", n.message)
      }
    }
  }
}

/// Logs every notification and fans it out to subscribers.
///
/// Sending with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
  tx: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity.max(1));
    Self { tx }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<Notification> { self.tx.subscribe() }
}

impl Notifier for BroadcastNotifier {
  fn notify(&self, n: Notification) {
    LogNotifier.notify(n.clone());
    let _ = self.tx.send(n);
  }
}
