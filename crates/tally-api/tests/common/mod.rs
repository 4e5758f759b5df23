//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use tally_core::clock::Clock;
use tally_ingestion::application::ingestion::SignaturePolicy;
use tally_test_support::{FixedClock, InMemoryEventRepository, InMemoryMetricRepository};
use tower::ServiceExt;

use tally_api::config::HubConfig;
use tally_api::routes;
use tally_api::state::AppState;
use tally_api::subscription::ConfiguredSubscriptionManager;

/// Shared secret used by signed core hub tests.
pub const SECRET: &str = "integration-secret";

/// Fixed timestamp used across all integration tests.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

/// In-memory stores behind one app, so tests can inspect what was written.
pub struct TestApp {
    pub events: Arc<InMemoryEventRepository>,
    pub metrics: Arc<InMemoryMetricRepository>,
    state: AppState,
}

impl TestApp {
    /// A fresh router over the shared state. Each request consumes one.
    pub fn router(&self) -> Router {
        routes::router().with_state(self.state.clone())
    }
}

/// Build the full app with in-memory stores and signature checks off.
pub fn build_test_app() -> TestApp {
    build_test_app_with_policy(SignaturePolicy::disabled())
}

/// Build the full app enforcing signatures with [`SECRET`].
pub fn build_signed_test_app() -> TestApp {
    build_test_app_with_policy(SignaturePolicy::new(Some(SECRET.to_owned()), true))
}

fn build_test_app_with_policy(policy: SignaturePolicy) -> TestApp {
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(FixedClock(fixed_now()));
    let events = Arc::new(InMemoryEventRepository::new());
    let metrics = Arc::new(InMemoryMetricRepository::new());
    let hub = HubConfig {
        hub_url: Some("https://hub.test".to_owned()),
        callback_url: Some("https://tally.test/webhook/core-hub".to_owned()),
        channels: vec!["users.created".to_owned(), "payments.approved".to_owned()],
    };
    let manager = Arc::new(ConfiguredSubscriptionManager::new(&hub, policy.is_enforced()));
    let state = AppState::new(clock, events.clone(), metrics.clone(), manager, policy);

    TestApp {
        events,
        metrics,
        state,
    }
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    post_raw(app, uri, serde_json::to_vec(body).unwrap(), None).await
}

/// Send a POST request with raw bytes and an optional signature header.
pub async fn post_raw(
    app: Router,
    uri: &str,
    body: Vec<u8>,
    signature: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header(tally_api::routes::webhook::SIGNATURE_HEADER, signature);
    }
    let request = builder.body(Body::from(body)).unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// A direct webhook body.
pub fn direct_event(category: &str, event_type: &str, body: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "queue": category,
        "event": {
            "category": category,
            "topic": format!("{category}.events"),
            "type": event_type,
            "body": body,
            "occurredAt": "2026-01-15T09:00:00Z"
        },
        "correlationId": "corr-it"
    })
}

/// A core hub delivery envelope, serialized.
pub fn hub_delivery(message_id: &str, channel: &str, routing_key: &str, payload: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "messageId": message_id,
        "timestamp": "2026-01-15T09:30:00Z",
        "destination": { "channel": channel, "routingKey": routing_key },
        "payload": payload
    }))
    .unwrap()
}
