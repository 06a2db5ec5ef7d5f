//! The ride lifecycle state machine.
//!
//! `pending → accepted → driver_arriving → in_progress → completed`, with
//! `cancelled` reserved for externally initiated termination. `completed` and
//! `cancelled` absorb: nothing leaves them.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Where a ride is in its lifecycle.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RideStatus {
  Pending,
  Accepted,
  DriverArriving,
  InProgress,
  Completed,
  Cancelled,
}

impl RideStatus {
  /// The statuses a passenger's active-ride view will pick up.
  pub const ACTIVE: [RideStatus; 4] = [
    RideStatus::Pending,
    RideStatus::Accepted,
    RideStatus::DriverArriving,
    RideStatus::InProgress,
  ];

  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Completed | Self::Cancelled)
  }

  pub fn is_active(self) -> bool { Self::ACTIVE.contains(&self) }

  /// Position along the forward path. `Cancelled` sits off the path.
  fn rank(self) -> Option<u8> {
    match self {
      Self::Pending => Some(0),
      Self::Accepted => Some(1),
      Self::DriverArriving => Some(2),
      Self::InProgress => Some(3),
      Self::Completed => Some(4),
      Self::Cancelled => None,
    }
  }

  /// Whether a patch may move a ride from `self` to `next`.
  ///
  /// Re-asserting the current status is always allowed. Otherwise a
  /// non-terminal ride may move forward (skipping stages is fine) or be
  /// cancelled.
  pub fn can_transition_to(self, next: RideStatus) -> bool {
    if self == next {
      return true;
    }
    if self.is_terminal() {
      return false;
    }
    match (self.rank(), next.rank()) {
      (_, None) => true,
      (Some(from), Some(to)) => to > from,
      (None, Some(_)) => false,
    }
  }

  /// One-line summary for the active-ride header.
  pub fn headline(self) -> &'static str {
    match self {
      Self::Accepted => "Driver is on the way",
      Self::DriverArriving => "Driver arriving soon",
      _ => "Ride in progress",
    }
  }
}

// ─── Stages ──────────────────────────────────────────────────────────────────

/// One step of the progress tracker shown alongside an active ride.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
  pub label:     String,
  pub completed: bool,
}

/// The four tracker stages for a ride in `status`.
pub fn stages(status: RideStatus) -> [Stage; 4] {
  [
    Stage { label: "Driver Assigned".into(), completed: true },
    Stage {
      label:     "Driver Arriving".into(),
      completed: status != RideStatus::Accepted,
    },
    Stage {
      label:     "In Progress".into(),
      completed: matches!(status, RideStatus::InProgress | RideStatus::Completed),
    },
    Stage {
      label:     "Completed".into(),
      completed: status == RideStatus::Completed,
    },
  ]
}
