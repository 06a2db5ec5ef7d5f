//! Async HTTP client wrapping the ride JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Response, StatusCode};
use ride_core::{
  lifecycle::RideStatus,
  ride::{BookingDraft, BookingTerms, Ride, RideId, RidePatch},
};
use ride_monitor::MonitorSnapshot;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// Connection settings for the ride API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

/// Filters for [`ApiClient::list_rides`].
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
  pub passenger_id: Option<String>,
  pub driver_id:    Option<String>,
  pub statuses:     Vec<RideStatus>,
}

/// Async HTTP client for the ride JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  // ── Rides ─────────────────────────────────────────────────────────────────

  /// `GET /api/rides[?passenger_id=..][&driver_id=..][&status=..]`
  pub async fn list_rides(&self, filter: &ListFilter) -> Result<Vec<Ride>> {
    let mut query: Vec<(&str, String)> = Vec::new();
    if let Some(p) = &filter.passenger_id {
      query.push(("passenger_id", p.clone()));
    }
    if let Some(d) = &filter.driver_id {
      query.push(("driver_id", d.clone()));
    }
    if !filter.statuses.is_empty() {
      let list: Vec<String> = filter.statuses.iter().map(ToString::to_string).collect();
      query.push(("status", list.join(",")));
    }

    let resp = self
      .client
      .get(self.url("/rides"))
      .query(&query)
      .send()
      .await
      .context("GET /rides failed")?;
    decode(resp, "GET /rides").await
  }

  /// `GET /api/rides/{id}`
  pub async fn get_ride(&self, id: &RideId) -> Result<Ride> {
    let what = format!("GET /rides/{id}");
    let resp = self
      .client
      .get(self.url(&format!("/rides/{id}")))
      .send()
      .await
      .with_context(|| format!("{what} failed"))?;
    decode(resp, &what).await
  }

  /// `PATCH /api/rides/{id}`
  pub async fn update_ride(&self, id: &RideId, patch: &RidePatch) -> Result<Ride> {
    let what = format!("PATCH /rides/{id}");
    let resp = self
      .client
      .patch(self.url(&format!("/rides/{id}")))
      .json(patch)
      .send()
      .await
      .with_context(|| format!("{what} failed"))?;
    decode(resp, &what).await
  }

  // ── Booking ───────────────────────────────────────────────────────────────

  /// `PATCH /api/booking` then `POST /api/booking/confirm`.
  pub async fn book(&self, draft: &BookingDraft, terms: &BookingTerms) -> Result<Ride> {
    let resp = self
      .client
      .patch(self.url("/booking"))
      .json(draft)
      .send()
      .await
      .context("PATCH /booking failed")?;
    let _: BookingDraft = decode(resp, "PATCH /booking").await?;

    let resp = self
      .client
      .post(self.url("/booking/confirm"))
      .json(terms)
      .send()
      .await
      .context("POST /booking/confirm failed")?;
    decode(resp, "POST /booking/confirm").await
  }

  // ── Monitor ───────────────────────────────────────────────────────────────

  /// `POST /api/passengers/{id}/monitor`. `None` when the passenger has no
  /// active ride.
  pub async fn watch(&self, passenger_id: &str) -> Result<Option<MonitorSnapshot>> {
    let what = format!("POST /passengers/{passenger_id}/monitor");
    let resp = self
      .client
      .post(self.url(&format!("/passengers/{passenger_id}/monitor")))
      .send()
      .await
      .with_context(|| format!("{what} failed"))?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    decode(resp, &what).await.map(Some)
  }

  /// `GET /api/rides/{id}/monitor`. `None` when the ride is not monitored.
  pub async fn snapshot(&self, id: &RideId) -> Result<Option<MonitorSnapshot>> {
    let what = format!("GET /rides/{id}/monitor");
    let resp = self
      .client
      .get(self.url(&format!("/rides/{id}/monitor")))
      .send()
      .await
      .with_context(|| format!("{what} failed"))?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    decode(resp, &what).await.map(Some)
  }

  /// `POST /api/rides/{id}/sos`
  pub async fn sos(&self, id: &RideId) -> Result<()> {
    self.fire(&format!("/rides/{id}/sos")).await
  }

  /// `POST /api/rides/{id}/share`
  pub async fn share(&self, id: &RideId) -> Result<()> {
    self.fire(&format!("/rides/{id}/share")).await
  }

  async fn fire(&self, path: &str) -> Result<()> {
    let resp = self
      .client
      .post(self.url(path))
      .send()
      .await
      .with_context(|| format!("POST {path} failed"))?;
    check(resp, &format!("POST {path}")).await.map(drop)
  }
}

// ─── Response helpers ─────────────────────────────────────────────────────────

/// Fail with the server's `{"error": ...}` message on a non-2xx status.
async fn check(resp: Response, what: &str) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body: Value = resp.json().await.unwrap_or_else(|_| json!({}));
  match body.get("error").and_then(Value::as_str) {
    Some(message) => Err(anyhow!("{what} → {status}: {message}")),
    None => Err(anyhow!("{what} → {status}")),
  }
}

async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
  check(resp, what)
    .await?
    .json()
    .await
    .with_context(|| format!("deserialising {what} response"))
}
