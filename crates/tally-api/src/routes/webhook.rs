//! Webhook ingestion endpoints.
//!
//! Both handlers take the raw body: the core hub signature covers the exact
//! bytes received, and malformed payloads are normalized rather than
//! rejected, so no JSON extractor sits in front of the pipeline.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::{Json, Router, routing::post};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use tally_ingestion::application::ingestion;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the core hub HMAC signature (`sha256=<hex>`).
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Response body for `POST /webhook`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    /// Always `true`.
    pub success: bool,
    /// Human-readable outcome.
    pub message: &'static str,
    /// Identifier of the stored event.
    pub event_id: Uuid,
}

/// Response body for `POST /webhook/core-hub`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreHubResponse {
    /// Always `true`.
    pub success: bool,
    /// Human-readable outcome.
    pub message: &'static str,
    /// Identifier of the stored event.
    pub event_id: Uuid,
    /// Upstream message identifier, echoed back.
    pub message_id: Option<String>,
}

/// POST /webhook
#[instrument(skip(state, body), fields(bytes = body.len()))]
async fn direct_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let receipt = ingestion::handle_direct_webhook(
        &body,
        state.clock.as_ref(),
        &*state.event_repository,
        &*state.metric_repository,
    )
    .await?;

    info!(event_id = %receipt.event_id, "direct webhook ingested");

    Ok(Json(WebhookResponse {
        success: true,
        message: "Event processed successfully",
        event_id: receipt.event_id,
    }))
}

/// POST /webhook/core-hub
#[instrument(skip(state, headers, body), fields(bytes = body.len()))]
async fn core_hub_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CoreHubResponse>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let receipt = ingestion::handle_core_hub_webhook(
        &body,
        signature,
        &state.signature_policy,
        state.clock.as_ref(),
        &*state.event_repository,
        &*state.metric_repository,
    )
    .await?;

    info!(
        event_id = %receipt.event_id,
        message_id = receipt.message_id.as_deref().unwrap_or_default(),
        "core hub delivery ingested"
    );

    Ok(Json(CoreHubResponse {
        success: true,
        message: "Core hub event processed successfully",
        event_id: receipt.event_id,
        message_id: receipt.message_id,
    }))
}

/// Returns the webhook router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook", post(direct_webhook))
        .route("/webhook/core-hub", post(core_hub_webhook))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use serde_json::{Value, json};
    use tally_core::clock::Clock;
    use tally_core::repository::{EventRepository, MetricRepository};
    use tally_ingestion::application::ingestion::SignaturePolicy;
    use tally_ingestion::domain::signature;
    use tally_test_support::{
        FailingEventRepository, FixedClock, InMemoryEventRepository, InMemoryMetricRepository,
    };
    use tower::ServiceExt;

    use crate::config::HubConfig;
    use crate::subscription::ConfiguredSubscriptionManager;

    const SECRET: &str = "hub-secret";

    fn app_state_with(
        event_repository: Arc<dyn EventRepository>,
        metric_repository: Arc<dyn MetricRepository>,
        policy: SignaturePolicy,
    ) -> AppState {
        let clock: Arc<dyn Clock + Send + Sync> =
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()));
        let manager = Arc::new(ConfiguredSubscriptionManager::new(&HubConfig::default(), false));
        AppState::new(clock, event_repository, metric_repository, manager, policy)
    }

    fn direct_body() -> Value {
        json!({
            "queue": "users",
            "event": {
                "category": "users",
                "topic": "users.lifecycle",
                "type": "UserCreated",
                "body": { "userId": "u-1" }
            },
            "correlationId": "corr-1"
        })
    }

    fn hub_body() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "messageId": "msg-1",
            "destination": { "channel": "payments.approved", "routingKey": "PaymentApproved" },
            "payload": { "amount": 99.5 }
        }))
        .unwrap()
    }

    fn post(uri: &str, body: Vec<u8>, signature: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn json_of(response: axum::response::Response) -> Value {
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body_bytes).unwrap()
    }

    #[tokio::test]
    async fn test_direct_webhook_returns_200_with_event_id() {
        // Arrange
        let events = Arc::new(InMemoryEventRepository::new());
        let metrics = Arc::new(InMemoryMetricRepository::new());
        let app = router().with_state(app_state_with(
            events.clone(),
            metrics.clone(),
            SignaturePolicy::disabled(),
        ));
        let request = post("/webhook", serde_json::to_vec(&direct_body()).unwrap(), None);

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        assert_eq!(json["success"], true);
        let event_id = Uuid::parse_str(json["eventId"].as_str().unwrap()).unwrap();
        let stored = events.events();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, event_id);
        assert!(stored[0].is_processed());
        assert_eq!(metrics.metrics().len(), 2);
    }

    #[tokio::test]
    async fn test_direct_webhook_accepts_non_json_body() {
        // Arrange
        let events = Arc::new(InMemoryEventRepository::new());
        let app = router().with_state(app_state_with(
            events.clone(),
            Arc::new(InMemoryMetricRepository::new()),
            SignaturePolicy::disabled(),
        ));
        let request = post("/webhook", b"not json at all".to_vec(), None);

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(events.events()[0].category, "unknown");
    }

    #[tokio::test]
    async fn test_direct_webhook_returns_500_when_repository_fails() {
        // Arrange
        let app = router().with_state(app_state_with(
            Arc::new(FailingEventRepository),
            Arc::new(InMemoryMetricRepository::new()),
            SignaturePolicy::disabled(),
        ));
        let request = post("/webhook", serde_json::to_vec(&direct_body()).unwrap(), None);

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_of(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "persistence_failure");
    }

    #[tokio::test]
    async fn test_core_hub_webhook_with_valid_signature_returns_200() {
        // Arrange
        let events = Arc::new(InMemoryEventRepository::new());
        let metrics = Arc::new(InMemoryMetricRepository::new());
        let app = router().with_state(app_state_with(
            events.clone(),
            metrics.clone(),
            SignaturePolicy::new(Some(SECRET.to_owned()), true),
        ));
        let body = hub_body();
        let header = signature::sign(&body, SECRET).unwrap();

        // Act
        let response = app
            .oneshot(post("/webhook/core-hub", body, Some(&header)))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        assert_eq!(json["messageId"], "msg-1");
        assert_eq!(events.events()[0].category, "payments");
        let revenue: f64 = metrics
            .metrics()
            .iter()
            .filter(|m| m.name == "total_revenue")
            .map(|m| m.value)
            .sum();
        assert!((revenue - 99.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_core_hub_webhook_with_bad_signature_returns_401_and_stores_nothing() {
        // Arrange
        let events = Arc::new(InMemoryEventRepository::new());
        let metrics = Arc::new(InMemoryMetricRepository::new());
        let app = router().with_state(app_state_with(
            events.clone(),
            metrics.clone(),
            SignaturePolicy::new(Some(SECRET.to_owned()), true),
        ));
        let header = signature::sign(&hub_body(), "wrong-secret").unwrap();

        // Act
        let response = app
            .oneshot(post("/webhook/core-hub", hub_body(), Some(&header)))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = json_of(response).await;
        assert_eq!(json["message"], "Invalid webhook signature");
        assert!(events.events().is_empty());
        assert!(metrics.metrics().is_empty());
    }

    #[tokio::test]
    async fn test_core_hub_webhook_without_enforcement_ignores_missing_header() {
        // Arrange
        let events = Arc::new(InMemoryEventRepository::new());
        let app = router().with_state(app_state_with(
            events.clone(),
            Arc::new(InMemoryMetricRepository::new()),
            SignaturePolicy::new(Some(SECRET.to_owned()), false),
        ));

        // Act
        let response = app
            .oneshot(post("/webhook/core-hub", hub_body(), None))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(events.events().len(), 1);
    }
}
