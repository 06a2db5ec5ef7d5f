//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use ride_core::{lifecycle::RideStatus, meter::MeterConfig, ride::Ride};
use ride_monitor::{BroadcastNotifier, MonitorRegistry, MonitorSnapshot, NotificationLevel};
use ride_store_memory::MemoryStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{ApiState, api_router};

fn make_state() -> (ApiState<MemoryStore>, BroadcastNotifier) {
  let store = Arc::new(MemoryStore::new());
  let notifier = BroadcastNotifier::new(16);
  let monitors = Arc::new(MonitorRegistry::new(
    store.clone(),
    Arc::new(notifier.clone()),
    MeterConfig::default(),
  ));
  (ApiState { store, monitors }, notifier)
}

async fn send(
  state: &ApiState<MemoryStore>,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> Response {
  let builder = Request::builder().method(method).uri(uri);
  let req = match body {
    Some(v) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(v.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };
  api_router(state.clone()).oneshot(req).await.unwrap()
}

async fn json_body<T: serde::de::DeserializeOwned>(resp: Response) -> T {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

fn new_ride(passenger_id: &str) -> Value {
  json!({
    "passenger_id": passenger_id,
    "vehicle_id": "v1",
    "vehicle_type": "sedan",
    "pickup": { "address": "MG Road", "lat": 12.97, "lng": 77.61 },
    "destination": { "address": "Airport" },
    "distance": 12.5,
    "duration": 10,
    "fare": 500.0
  })
}

async fn create(state: &ApiState<MemoryStore>, passenger_id: &str) -> Ride {
  let resp = send(state, "POST", "/rides", Some(new_ride(passenger_id))).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  json_body(resp).await
}

// ── Rides ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_get_returns_pending_ride() {
  let (state, _) = make_state();
  let ride = create(&state, "p1").await;
  assert_eq!(ride.status, RideStatus::Pending);
  assert!(ride.id.as_str().starts_with("ride_"));

  let resp = send(&state, "GET", &format!("/rides/{}", ride.id), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let got: Ride = json_body(resp).await;
  assert_eq!(got, ride);
}

#[tokio::test]
async fn unknown_ride_is_404_with_json_error() {
  let (state, _) = make_state();
  let resp = send(&state, "GET", "/rides/ride_missing", None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  let body: Value = json_body(resp).await;
  assert!(body["error"].as_str().unwrap().contains("ride_missing"));

  let resp = send(
    &state,
    "PATCH",
    "/rides/ride_missing",
    Some(json!({ "status": "accepted" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patch_applies_and_rejects_illegal_transitions() {
  let (state, _) = make_state();
  let ride = create(&state, "p1").await;
  let uri = format!("/rides/{}", ride.id);

  let resp = send(
    &state,
    "PATCH",
    &uri,
    Some(json!({ "status": "accepted", "driver_id": "d1" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let updated: Ride = json_body(resp).await;
  assert_eq!(updated.status, RideStatus::Accepted);
  assert_eq!(updated.driver_id.as_deref(), Some("d1"));

  let resp = send(&state, "PATCH", &uri, Some(json!({ "status": "pending" }))).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn list_filters_by_passenger_and_status() {
  let (state, _) = make_state();
  let first = create(&state, "p1").await;
  create(&state, "p2").await;
  let third = create(&state, "p1").await;
  send(
    &state,
    "PATCH",
    &format!("/rides/{}", first.id),
    Some(json!({ "status": "cancelled" })),
  )
  .await;

  let resp = send(&state, "GET", "/rides?passenger_id=p1", None).await;
  let rides: Vec<Ride> = json_body(resp).await;
  let ids: Vec<_> = rides.into_iter().map(|r| r.id).collect();
  assert_eq!(ids, vec![third.id.clone(), first.id]);

  let resp = send(&state, "GET", "/rides?passenger_id=p1&status=pending,accepted", None).await;
  let rides: Vec<Ride> = json_body(resp).await;
  assert_eq!(rides.len(), 1);
  assert_eq!(rides[0].id, third.id);

  let resp = send(&state, "GET", "/rides?status=flying", None).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn current_ride_follows_creation_and_can_be_moved() {
  let (state, _) = make_state();
  let resp = send(&state, "GET", "/rides/current", None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);

  let a = create(&state, "p1").await;
  let b = create(&state, "p2").await;
  let current: Ride = json_body(send(&state, "GET", "/rides/current", None).await).await;
  assert_eq!(current.id, b.id);

  let resp = send(&state, "PUT", "/rides/current", Some(json!({ "ride_id": a.id }))).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let current: Ride = json_body(send(&state, "GET", "/rides/current", None).await).await;
  assert_eq!(current.id, a.id);

  let resp = send(
    &state,
    "PUT",
    "/rides/current",
    Some(json!({ "ride_id": "ride_missing" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);

  let resp = send(&state, "PUT", "/rides/current", Some(json!({ "ride_id": null }))).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);
  let resp = send(&state, "GET", "/rides/current", None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── Booking ─────────────────────────────────────────────────────────────────

fn terms() -> Value {
  json!({
    "passenger_id": "p1",
    "vehicle_id": "v7",
    "distance": 4.0,
    "duration": 12,
    "fare": 180.0
  })
}

#[tokio::test]
async fn confirm_without_full_draft_is_400() {
  let (state, _) = make_state();
  send(
    &state,
    "PATCH",
    "/booking",
    Some(json!({ "pickup": { "address": "Home" } })),
  )
  .await;

  let resp = send(&state, "POST", "/booking/confirm", Some(terms())).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = json_body(resp).await;
  assert!(body["error"].as_str().unwrap().contains("destination"));
}

#[tokio::test]
async fn staged_draft_books_a_ride() {
  let (state, _) = make_state();
  send(
    &state,
    "PATCH",
    "/booking",
    Some(json!({ "pickup": { "address": "Home" }, "vehicle_type": "auto" })),
  )
  .await;
  let resp = send(
    &state,
    "PATCH",
    "/booking",
    Some(json!({ "destination": { "address": "Office" } })),
  )
  .await;
  let draft: Value = json_body(resp).await;
  assert_eq!(draft["pickup"]["address"], "Home");
  assert_eq!(draft["destination"]["address"], "Office");

  let resp = send(&state, "POST", "/booking/confirm", Some(terms())).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let ride: Ride = json_body(resp).await;
  assert_eq!(ride.pickup.address, "Home");
  assert_eq!(ride.vehicle_id, "v7");
  assert_eq!(ride.fare, 180.0);

  let current: Ride = json_body(send(&state, "GET", "/rides/current", None).await).await;
  assert_eq!(current.id, ride.id);
}

// ── Monitor ─────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn watch_starts_monitor_and_snapshot_advances() {
  let (state, _) = make_state();
  let ride = create(&state, "p1").await;

  let resp = send(&state, "POST", "/passengers/p1/monitor", None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let snap: MonitorSnapshot = json_body(resp).await;
  assert_eq!(snap.ride_id, ride.id);
  assert_eq!(snap.progress, 0.0);
  assert_eq!(snap.eta_minutes, 15);

  tokio::time::sleep(std::time::Duration::from_millis(4_500)).await;
  let resp = send(&state, "GET", &format!("/rides/{}/monitor", ride.id), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let snap: MonitorSnapshot = json_body(resp).await;
  assert_eq!(snap.progress, 2.0);

  let resp = send(&state, "DELETE", &format!("/rides/{}/monitor", ride.id), None).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);
  let resp = send(&state, "GET", &format!("/rides/{}/monitor", ride.id), None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn watch_without_active_ride_is_404() {
  let (state, _) = make_state();
  let resp = send(&state, "POST", "/passengers/nobody/monitor", None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  let body: Value = json_body(resp).await;
  assert_eq!(body["error"], "no active ride");
}

#[tokio::test]
async fn sos_and_share_notify_without_changing_the_ride() {
  let (state, notifier) = make_state();
  let mut rx = notifier.subscribe();
  let ride = create(&state, "p1").await;

  let resp = send(&state, "POST", &format!("/rides/{}/sos", ride.id), None).await;
  assert_eq!(resp.status(), StatusCode::ACCEPTED);
  let resp = send(&state, "POST", &format!("/rides/{}/share", ride.id), None).await;
  assert_eq!(resp.status(), StatusCode::ACCEPTED);

  let sos = rx.try_recv().unwrap();
  assert_eq!(sos.level, NotificationLevel::Alert);
  assert_eq!(sos.ride_id, ride.id);
  let shared = rx.try_recv().unwrap();
  assert_eq!(shared.title, "Ride Details Shared");

  let got: Ride = json_body(send(&state, "GET", &format!("/rides/{}", ride.id), None).await).await;
  assert_eq!(got, ride);
}

#[tokio::test]
async fn sos_and_share_for_unknown_ride_are_404() {
  let (state, notifier) = make_state();
  let mut rx = notifier.subscribe();

  for action in ["sos", "share"] {
    let resp = send(&state, "POST", &format!("/rides/ride_missing/{action}"), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = json_body(resp).await;
    assert_eq!(body["error"], "ride ride_missing not found");
  }
  assert!(rx.try_recv().is_err());
}
