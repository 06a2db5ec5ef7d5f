//! [`MonitorRegistry`]: one timer task per monitored ride.
//!
//! Starting a monitor for a ride that already has one aborts the old task
//! first, so a ride never has two sets of timers mutating it. Tasks end on
//! completion, on [`MonitorRegistry::stop`], when a passenger's view moves to
//! a different ride, or when the registry is dropped. A task that ends on its
//! own removes itself from the registry and leaves its final snapshot behind.

use std::{
  collections::{HashMap, VecDeque},
  sync::{Arc, Mutex, MutexGuard, Weak},
  time::Duration,
};

use ride_core::{meter::MeterConfig, ride::{Ride, RideId}, store::RideStore};
use tokio::{
  sync::watch,
  task::JoinHandle,
  time::{Instant, Interval, interval_at},
};
use tracing::{debug, info, warn};

use crate::{
  notify::{Notification, Notifier},
  select::select_active_ride,
  tracker::{MonitorSnapshot, RideTracker, TickOutcome},
};

/// How many final snapshots of finished monitors are kept for lookup.
pub const RETAINED_FINAL_SNAPSHOTS: usize = 64;

struct MonitorHandle {
  task:       JoinHandle<()>,
  snapshot:   watch::Receiver<MonitorSnapshot>,
  generation: u64,
}

#[derive(Default)]
struct Monitors {
  by_ride:         HashMap<RideId, MonitorHandle>,
  /// Which ride each passenger's view is following.
  by_viewer:       HashMap<String, RideId>,
  /// Final snapshots of tasks that ended on their own, newest first.
  finished:        VecDeque<MonitorSnapshot>,
  next_generation: u64,
}

impl Monitors {
  fn abort(&mut self, id: &RideId) -> bool {
    self.forget_finished(id);
    match self.by_ride.remove(id) {
      Some(handle) => {
        handle.task.abort();
        true
      }
      None => false,
    }
  }

  fn forget_finished(&mut self, id: &RideId) {
    self.finished.retain(|s| s.ride_id != *id);
  }

  /// Drop the entry of a task that ended by itself. A newer task for the
  /// same ride carries a different generation and is left alone.
  fn retire(&mut self, generation: u64, last: MonitorSnapshot) {
    let id = last.ride_id.clone();
    if self.by_ride.get(&id).is_none_or(|h| h.generation != generation) {
      return;
    }
    self.by_ride.remove(&id);
    self.by_viewer.retain(|_, ride| *ride != id);

    self.forget_finished(&id);
    self.finished.push_front(last);
    self.finished.truncate(RETAINED_FINAL_SNAPSHOTS);
  }

  fn clear(&mut self) {
    for (_, handle) in self.by_ride.drain() {
      handle.task.abort();
    }
    self.by_viewer.clear();
    self.finished.clear();
  }
}

fn lock_monitors(monitors: &Mutex<Monitors>) -> MutexGuard<'_, Monitors> {
  // A panic while holding the lock cannot leave the maps half-updated.
  monitors.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Owns every running monitor task.
pub struct MonitorRegistry<S> {
  store:    Arc<S>,
  notifier: Arc<dyn Notifier>,
  config:   MeterConfig,
  monitors: Arc<Mutex<Monitors>>,
}

impl<S> MonitorRegistry<S>
where
  S: RideStore + 'static,
{
  pub fn new(store: Arc<S>, notifier: Arc<dyn Notifier>, config: MeterConfig) -> Self {
    Self {
      store,
      notifier,
      config,
      monitors: Arc::new(Mutex::new(Monitors::default())),
    }
  }

  fn lock(&self) -> MutexGuard<'_, Monitors> { lock_monitors(&self.monitors) }

  /// Select the ride `passenger_id` should be watching and make sure it is
  /// monitored. Returns `None` when there is no active ride.
  ///
  /// If the ride is already being monitored its counters are kept. If the
  /// passenger was following a different ride, that ride's monitor stops.
  pub async fn watch_passenger(
    &self,
    passenger_id: &str,
  ) -> Result<Option<MonitorSnapshot>, S::Error> {
    let selected = select_active_ride(self.store.as_ref(), passenger_id).await?;

    let mut monitors = self.lock();
    let previous = monitors.by_viewer.remove(passenger_id);

    let Some(ride) = selected else {
      if let Some(prev) = previous {
        monitors.abort(&prev);
      }
      debug!(passenger_id, "no active ride to watch");
      return Ok(None);
    };

    if let Some(prev) = previous.filter(|prev| *prev != ride.id) {
      monitors.abort(&prev);
      debug!(passenger_id, ride_id = %prev, "view moved off ride");
    }
    monitors.by_viewer.insert(passenger_id.to_owned(), ride.id.clone());

    if let Some(handle) = monitors.by_ride.get(&ride.id)
      && !handle.task.is_finished()
    {
      return Ok(Some(handle.snapshot.borrow().clone()));
    }

    Ok(Some(self.spawn(&mut monitors, ride)))
  }

  /// Start monitoring `ride` with fresh counters, replacing any monitor it
  /// already has.
  pub fn start(&self, ride: Ride) -> MonitorSnapshot {
    let mut monitors = self.lock();
    self.spawn(&mut monitors, ride)
  }

  fn spawn(&self, monitors: &mut Monitors, ride: Ride) -> MonitorSnapshot {
    let id = ride.id.clone();
    if monitors.abort(&id) {
      debug!(ride_id = %id, "replacing existing monitor");
    }

    let tracker = RideTracker::new(
      self.store.clone(),
      self.notifier.clone(),
      self.config,
      ride,
    );
    let initial = tracker.snapshot();
    let (tx, rx) = watch::channel(initial.clone());

    let generation = monitors.next_generation;
    monitors.next_generation += 1;
    let owner = Arc::downgrade(&self.monitors);
    let task = tokio::spawn(run(tracker, self.config, tx, owner, generation));

    info!(ride_id = %id, "monitor started");
    monitors
      .by_ride
      .insert(id, MonitorHandle { task, snapshot: rx, generation });
    initial
  }

  /// Stop monitoring `id`. Returns whether a monitor was running.
  pub fn stop(&self, id: &RideId) -> bool {
    let mut monitors = self.lock();
    monitors.by_viewer.retain(|_, ride| ride != id);
    let stopped = monitors.abort(id);
    if stopped {
      info!(ride_id = %id, "monitor stopped");
    }
    stopped
  }

  /// Stop every monitor.
  pub fn stop_all(&self) { self.lock().clear(); }

  /// The latest snapshot for `id`. A monitor that ended on its own keeps its
  /// final snapshot, among the most recent [`RETAINED_FINAL_SNAPSHOTS`],
  /// until it is stopped or restarted.
  pub fn snapshot(&self, id: &RideId) -> Option<MonitorSnapshot> {
    let monitors = self.lock();
    match monitors.by_ride.get(id) {
      Some(handle) => Some(handle.snapshot.borrow().clone()),
      None => monitors.finished.iter().find(|s| s.ride_id == *id).cloned(),
    }
  }

  /// Whether `id` has a live timer task.
  pub fn is_running(&self, id: &RideId) -> bool {
    let monitors = self.lock();
    monitors.by_ride.get(id).is_some_and(|h| !h.task.is_finished())
  }

  /// Number of live timer tasks.
  pub fn running(&self) -> usize {
    let monitors = self.lock();
    monitors.by_ride.values().filter(|h| !h.task.is_finished()).count()
  }

  /// Raise the emergency alert for `id`. No state changes.
  ///
  /// Returns `false`, sending nothing, if no such ride exists.
  pub async fn sos(&self, id: RideId) -> Result<bool, S::Error> {
    self.alert(id, Notification::sos).await
  }

  /// Announce that `id`'s details were shared. No state changes.
  ///
  /// Returns `false`, sending nothing, if no such ride exists.
  pub async fn share(&self, id: RideId) -> Result<bool, S::Error> {
    self.alert(id, Notification::shared).await
  }

  async fn alert(
    &self,
    id: RideId,
    notification: fn(RideId) -> Notification,
  ) -> Result<bool, S::Error> {
    if self.store.get_ride(id.clone()).await?.is_none() {
      debug!(ride_id = %id, "alert for unknown ride");
      return Ok(false);
    }
    self.notifier.notify(notification(id));
    Ok(true)
  }
}

impl<S> Drop for MonitorRegistry<S> {
  fn drop(&mut self) { lock_monitors(&self.monitors).clear(); }
}

// ─── Timer task ──────────────────────────────────────────────────────────────

/// An interval whose first tick is one full period away.
fn timer(period: Duration) -> Interval {
  let period = period.max(Duration::from_millis(1));
  interval_at(Instant::now() + period, period)
}

async fn run<S: RideStore>(
  mut tracker: RideTracker<S>,
  config: MeterConfig,
  tx: watch::Sender<MonitorSnapshot>,
  owner: Weak<Mutex<Monitors>>,
  generation: u64,
) {
  let mut progress = timer(config.progress_period());
  let mut eta = timer(config.eta_period());
  let mut fare = timer(config.fare_period());

  loop {
    tokio::select! {
      _ = progress.tick() => {
        match tracker.on_progress_tick().await {
          Ok(TickOutcome::Running) => {}
          Ok(TickOutcome::Completed(_)) | Ok(TickOutcome::Ended) => break,
          Err(e) => {
            warn!(ride_id = %tracker.ride_id(), error = %e, "progress tick failed");
            break;
          }
        }
      }
      _ = eta.tick() => tracker.on_eta_tick(),
      _ = fare.tick() => {
        if let Err(e) = tracker.on_fare_tick().await {
          warn!(ride_id = %tracker.ride_id(), error = %e, "fare tick failed");
          break;
        }
      }
    }
    tx.send_replace(tracker.snapshot());
  }

  let last = tracker.snapshot();
  tx.send_replace(last.clone());
  if let Some(monitors) = owner.upgrade() {
    lock_monitors(&monitors).retire(generation, last);
  }
  debug!(ride_id = %tracker.ride_id(), "monitor task finished");
}

#[cfg(test)]
mod tests {
  use ride_core::{
    lifecycle::RideStatus,
    ride::{Location, NewRide, RidePatch, VehicleType},
  };
  use ride_store_memory::MemoryStore;
  use tokio::time::sleep;

  use super::*;
  use crate::notify::{BroadcastNotifier, NotificationLevel};

  fn new_ride(passenger_id: &str) -> NewRide {
    NewRide {
      passenger_id:   passenger_id.into(),
      driver_id:      Some("d1".into()),
      vehicle_id:     "v1".into(),
      vehicle_type:   VehicleType::Suv,
      pickup:         Location::from_address("Bandra"),
      destination:    Location::from_address("Powai"),
      distance:       14.0,
      duration:       10,
      fare:           500.0,
      scheduled_time: None,
    }
  }

  fn registry(
    store: Arc<MemoryStore>,
  ) -> (MonitorRegistry<MemoryStore>, BroadcastNotifier) {
    let notifier = BroadcastNotifier::new(16);
    let reg = MonitorRegistry::new(store, Arc::new(notifier.clone()), MeterConfig::default());
    (reg, notifier)
  }

  #[tokio::test(start_paused = true)]
  async fn monitor_completes_ride_on_the_clock() {
    let store = Arc::new(MemoryStore::new());
    let ride = store.create_ride(new_ride("p1")).await.unwrap();
    let (reg, notifier) = registry(store.clone());
    let mut rx = notifier.subscribe();

    let snap = reg.watch_passenger("p1").await.unwrap().unwrap();
    assert_eq!(snap.ride_id, ride.id);
    assert_eq!(snap.progress, 0.0);
    assert!(reg.is_running(&ride.id));

    sleep(Duration::from_secs(400)).await;

    let stored = store.get_ride(ride.id.clone()).await.unwrap().unwrap();
    assert_eq!(stored.status, RideStatus::Completed);
    assert!(stored.end_time.is_some());
    assert!(store.current_ride().await.unwrap().is_none());
    assert!(!reg.is_running(&ride.id));

    let last = reg.snapshot(&ride.id).unwrap();
    assert!(last.completed);
    assert_eq!(last.progress, 100.0);

    let n = rx.recv().await.unwrap();
    assert_eq!(n.level, NotificationLevel::Success);
    assert_eq!(n.title, "Ride Completed!");
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test(start_paused = true)]
  async fn snapshot_tracks_progress_and_eta() {
    let store = Arc::new(MemoryStore::new());
    let ride = store.create_ride(new_ride("p1")).await.unwrap();
    let (reg, _notifier) = registry(store);
    reg.start(ride.clone());

    sleep(Duration::from_millis(10_500)).await;

    let snap = reg.snapshot(&ride.id).unwrap();
    assert_eq!(snap.progress, 5.0);
    assert_eq!(snap.eta_minutes, 13);
    assert_eq!(snap.status, RideStatus::Pending);
  }

  #[tokio::test(start_paused = true)]
  async fn stopped_monitor_never_writes() {
    let store = Arc::new(MemoryStore::new());
    let ride = store.create_ride(new_ride("p1")).await.unwrap();
    let (reg, _notifier) = registry(store.clone());
    reg.start(ride.clone());

    sleep(Duration::from_secs(5)).await;
    assert!(reg.stop(&ride.id));
    assert!(!reg.stop(&ride.id));
    assert!(reg.snapshot(&ride.id).is_none());

    sleep(Duration::from_secs(400)).await;
    let stored = store.get_ride(ride.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RideStatus::Pending);
    assert_eq!(reg.running(), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn restart_replaces_timers() {
    let store = Arc::new(MemoryStore::new());
    let ride = store.create_ride(new_ride("p1")).await.unwrap();
    let (reg, _notifier) = registry(store);

    reg.start(ride.clone());
    sleep(Duration::from_millis(20_500)).await;
    let fresh = reg.start(ride.clone());
    assert_eq!(fresh.progress, 0.0);
    assert_eq!(reg.running(), 1);

    sleep(Duration::from_millis(2_500)).await;
    assert_eq!(reg.snapshot(&ride.id).unwrap().progress, 1.0);
  }

  #[tokio::test(start_paused = true)]
  async fn rewatching_same_ride_keeps_counters() {
    let store = Arc::new(MemoryStore::new());
    store.create_ride(new_ride("p1")).await.unwrap();
    let (reg, _notifier) = registry(store);

    reg.watch_passenger("p1").await.unwrap().unwrap();
    sleep(Duration::from_millis(4_500)).await;
    let again = reg.watch_passenger("p1").await.unwrap().unwrap();
    assert_eq!(again.progress, 2.0);
    assert_eq!(reg.running(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn view_change_tears_down_previous_ride() {
    let store = Arc::new(MemoryStore::new());
    let first = store.create_ride(new_ride("p1")).await.unwrap();
    let (reg, _notifier) = registry(store.clone());

    reg.watch_passenger("p1").await.unwrap().unwrap();
    assert!(reg.is_running(&first.id));

    store
      .update_ride(first.id.clone(), RidePatch::status(RideStatus::Cancelled))
      .await
      .unwrap();
    let second = store.create_ride(new_ride("p1")).await.unwrap();

    let snap = reg.watch_passenger("p1").await.unwrap().unwrap();
    assert_eq!(snap.ride_id, second.id);
    assert!(!reg.is_running(&first.id));
    assert!(reg.is_running(&second.id));
    assert_eq!(reg.running(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn no_active_ride_starts_nothing() {
    let store = Arc::new(MemoryStore::new());
    let (reg, _notifier) = registry(store);
    assert!(reg.watch_passenger("p1").await.unwrap().is_none());
    assert_eq!(reg.running(), 0);
  }

  #[tokio::test]
  async fn sos_and_share_only_notify() {
    let store = Arc::new(MemoryStore::new());
    let ride = store.create_ride(new_ride("p1")).await.unwrap();
    let (reg, notifier) = registry(store.clone());
    let mut rx = notifier.subscribe();

    assert!(reg.sos(ride.id.clone()).await.unwrap());
    assert!(reg.share(ride.id.clone()).await.unwrap());

    assert_eq!(rx.recv().await.unwrap().level, NotificationLevel::Alert);
    assert_eq!(rx.recv().await.unwrap().title, "Ride Details Shared");
    let stored = store.get_ride(ride.id.clone()).await.unwrap().unwrap();
    assert_eq!(stored, ride);
  }

  #[tokio::test]
  async fn alerts_for_unknown_ride_send_nothing() {
    let store = Arc::new(MemoryStore::new());
    let (reg, notifier) = registry(store);
    let mut rx = notifier.subscribe();

    let missing = RideId::from("ride_missing");
    assert!(!reg.sos(missing.clone()).await.unwrap());
    assert!(!reg.share(missing).await.unwrap());
    assert!(rx.try_recv().is_err());
  }

  // ─── Teardown ─────────────────────────────────────────────────────────────

  async fn start_three(
    store: &Arc<MemoryStore>,
    reg: &MonitorRegistry<MemoryStore>,
  ) -> Vec<RideId> {
    let mut ids = Vec::new();
    for passenger in ["p1", "p2", "p3"] {
      let ride = store.create_ride(new_ride(passenger)).await.unwrap();
      ids.push(ride.id.clone());
      reg.start(ride);
    }
    ids
  }

  async fn assert_untouched(store: &MemoryStore, ids: &[RideId]) {
    for id in ids {
      let stored = store.get_ride(id.clone()).await.unwrap().unwrap();
      assert_eq!(stored.status, RideStatus::Pending);
      assert!(stored.end_time.is_none());
    }
  }

  #[tokio::test(start_paused = true)]
  async fn stop_all_halts_every_monitor() {
    let store = Arc::new(MemoryStore::new());
    let (reg, notifier) = registry(store.clone());
    let mut rx = notifier.subscribe();
    let ids = start_three(&store, &reg).await;
    assert_eq!(reg.running(), 3);

    sleep(Duration::from_secs(5)).await;
    reg.stop_all();
    assert_eq!(reg.running(), 0);
    assert!(ids.iter().all(|id| reg.snapshot(id).is_none()));

    sleep(Duration::from_secs(400)).await;
    assert_untouched(&store, &ids).await;
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test(start_paused = true)]
  async fn dropping_the_registry_halts_every_monitor() {
    let store = Arc::new(MemoryStore::new());
    let (reg, notifier) = registry(store.clone());
    let mut rx = notifier.subscribe();
    let ids = start_three(&store, &reg).await;

    sleep(Duration::from_secs(5)).await;
    drop(reg);

    sleep(Duration::from_secs(400)).await;
    assert_untouched(&store, &ids).await;
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test(start_paused = true)]
  async fn finished_monitors_leave_the_registry() {
    let store = Arc::new(MemoryStore::new());
    let (reg, _notifier) = registry(store.clone());

    let mut ids = Vec::new();
    for i in 0..100 {
      let passenger = format!("p{i}");
      store.create_ride(new_ride(&passenger)).await.unwrap();
      let snap = reg.watch_passenger(&passenger).await.unwrap().unwrap();
      ids.push(snap.ride_id);
    }
    assert_eq!(reg.running(), 100);

    sleep(Duration::from_secs(400)).await;

    {
      let monitors = reg.lock();
      assert!(monitors.by_ride.is_empty());
      assert!(monitors.by_viewer.is_empty());
      assert_eq!(monitors.finished.len(), RETAINED_FINAL_SNAPSHOTS);
    }
    assert_eq!(reg.running(), 0);

    // Only the most recently finished final snapshots stay reachable.
    let kept = ids.iter().filter_map(|id| reg.snapshot(id)).collect::<Vec<_>>();
    assert_eq!(kept.len(), RETAINED_FINAL_SNAPSHOTS);
    assert!(kept.iter().all(|s| s.completed && s.progress == 100.0));

    // Restarting a finished ride drops its kept snapshot.
    let done = store.get_ride(kept[0].ride_id.clone()).await.unwrap().unwrap();
    assert_eq!(reg.start(done).progress, 0.0);
    assert_eq!(reg.lock().finished.len(), RETAINED_FINAL_SNAPSHOTS - 1);
  }

  // ─── Completion racing a stop ─────────────────────────────────────────────

  /// A [`MemoryStore`] whose completion write takes `delay` to land.
  struct SlowCompletion {
    inner: MemoryStore,
    delay: Duration,
  }

  impl RideStore for SlowCompletion {
    type Error = ride_store_memory::Error;

    async fn set_booking_data(
      &self,
      patch: ride_core::ride::BookingDraft,
    ) -> Result<ride_core::ride::BookingDraft, Self::Error> {
      self.inner.set_booking_data(patch).await
    }

    async fn booking_draft(
      &self,
    ) -> Result<ride_core::ride::BookingDraft, Self::Error> {
      self.inner.booking_draft().await
    }

    async fn create_ride(&self, input: NewRide) -> Result<Ride, Self::Error> {
      self.inner.create_ride(input).await
    }

    async fn update_ride(
      &self,
      id: RideId,
      patch: RidePatch,
    ) -> Result<Ride, Self::Error> {
      self.inner.update_ride(id, patch).await
    }

    async fn get_ride(&self, id: RideId) -> Result<Option<Ride>, Self::Error> {
      self.inner.get_ride(id).await
    }

    async fn list_rides(
      &self,
      query: ride_core::store::RideQuery,
    ) -> Result<Vec<Ride>, Self::Error> {
      self.inner.list_rides(query).await
    }

    async fn set_current_ride(
      &self,
      id: Option<RideId>,
    ) -> Result<Option<Ride>, Self::Error> {
      self.inner.set_current_ride(id).await
    }

    async fn current_ride(&self) -> Result<Option<Ride>, Self::Error> {
      self.inner.current_ride().await
    }

    async fn release_current_ride(&self, id: RideId) -> Result<bool, Self::Error> {
      self.inner.release_current_ride(id).await
    }

    async fn complete_ride(
      &self,
      id: RideId,
      at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Ride, Self::Error> {
      sleep(self.delay).await;
      self.inner.complete_ride(id, at).await
    }
  }

  #[tokio::test(start_paused = true)]
  async fn stop_during_completion_write_leaves_ride_consistent() {
    let store = Arc::new(SlowCompletion {
      inner: MemoryStore::new(),
      delay: Duration::from_millis(10),
    });
    let ride = store.create_ride(new_ride("p1")).await.unwrap();
    let notifier = BroadcastNotifier::new(16);
    let mut rx = notifier.subscribe();
    let reg = MonitorRegistry::new(
      store.clone(),
      Arc::new(notifier.clone()),
      MeterConfig::default(),
    );
    reg.start(ride.clone());

    // The final progress tick lands at 200s; its write is still in flight.
    sleep(Duration::from_millis(200_005)).await;
    assert!(reg.stop(&ride.id));
    sleep(Duration::from_secs(5)).await;

    let stored = store.get_ride(ride.id.clone()).await.unwrap().unwrap();
    assert_eq!(stored.status, RideStatus::Pending);
    assert!(stored.end_time.is_none());
    let current = store.current_ride().await.unwrap().unwrap();
    assert_eq!(current.id, ride.id);
    assert!(rx.try_recv().is_err());
  }
}
