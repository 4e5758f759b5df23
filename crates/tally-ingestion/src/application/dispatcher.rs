//! Metric dispatch: routes a persisted event to its metric emissions.
//!
//! All observations for one event are appended in a single
//! `append_metrics` call, so a store failure leaves none of them behind.
//! Redelivered events are dispatched again; observations are not
//! deduplicated.

use chrono::{DateTime, Utc};
use serde_json::json;
use tally_core::clock::Clock;
use tally_core::error::DomainError;
use tally_core::event::Event;
use tally_core::metric::Metric;
use tally_core::repository::MetricRepository;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::routing::{self, Resolution};

/// Builds the metric observations `event` should produce, without storing
/// them. Unknown categories and types produce nothing.
#[must_use]
pub fn plan_metrics(event: &Event, now: DateTime<Utc>) -> Vec<Metric> {
    let route = match routing::resolve(&event.category, &event.event_type) {
        Resolution::Matched(route) => route,
        Resolution::UnknownCategory => {
            warn!(
                event_id = %event.id,
                category = %event.category,
                "no metric handler for category"
            );
            return Vec::new();
        }
        Resolution::UnknownType(category) => {
            info!(
                event_id = %event.id,
                %category,
                event_type = %event.event_type,
                "event type has no metric emissions"
            );
            return Vec::new();
        }
    };

    let metadata = json!({
        "eventId": event.id,
        "category": event.category,
        "eventType": event.event_type,
        "source": event.source,
    });

    route
        .emissions
        .iter()
        .map(|emission| Metric {
            id: Uuid::now_v7(),
            name: emission.metric.to_owned(),
            value: emission.delta.evaluate(&event.payload),
            unit: emission.unit,
            period: emission.period,
            timestamp: now,
            metadata: Some(metadata.clone()),
        })
        .collect()
}

/// Dispatches `event`: plans its observations and appends them.
///
/// Returns the appended observations.
///
/// # Errors
///
/// Returns the store's `DomainError` if the append fails; nothing is
/// appended in that case.
pub async fn dispatch(
    event: &Event,
    clock: &dyn Clock,
    repo: &dyn MetricRepository,
) -> Result<Vec<Metric>, DomainError> {
    let metrics = plan_metrics(event, clock.now());
    if metrics.is_empty() {
        return Ok(metrics);
    }

    repo.append_metrics(&metrics).await?;

    debug!(
        event_id = %event.id,
        count = metrics.len(),
        "metrics appended"
    );
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::Value;
    use tally_core::event::{CanonicalEvent, EventSource};
    use tally_core::metric::{MetricPeriod, MetricUnit};
    use tally_test_support::{FailingMetricRepository, FixedClock, InMemoryMetricRepository};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    fn event(category: &str, event_type: &str, body: Value) -> Event {
        Event::new(
            Uuid::new_v4(),
            CanonicalEvent {
                category: category.to_owned(),
                topic: "topic".to_owned(),
                event_type: event_type.to_owned(),
                body,
                occurred_at: now(),
                correlation_id: None,
                message_id: None,
                source: EventSource::DirectWebhook,
            },
            now(),
        )
    }

    #[tokio::test]
    async fn test_dispatch_user_created_appends_two_metrics() {
        // Arrange
        let repo = InMemoryMetricRepository::new();
        let clock = FixedClock(now());
        let event = event("Users and Roles", "Usuario Creado", json!({}));

        // Act
        let metrics = dispatch(&event, &clock, &repo).await.unwrap();

        // Assert
        assert_eq!(metrics.len(), 2);
        assert_eq!(repo.metrics(), metrics);
        assert_eq!(metrics[0].name, "total_users");
        assert_eq!(metrics[1].name, "new_users_today");
        assert_eq!(metrics[1].period, MetricPeriod::Daily);
        assert_eq!(metrics[0].timestamp, now());
        let metadata = metrics[0].metadata.as_ref().unwrap();
        assert_eq!(metadata["eventId"], event.id.to_string());
        assert_eq!(metadata["source"], "direct-webhook");
    }

    #[tokio::test]
    async fn test_dispatch_payment_approved_reads_amount_from_hub_wrapper() {
        let repo = InMemoryMetricRepository::new();
        let clock = FixedClock(now());
        let event = event(
            "payments",
            "Pago Aprobado",
            json!({"messageId": "m1", "payload": {"amount": 500}}),
        );

        let metrics = dispatch(&event, &clock, &repo).await.unwrap();

        let revenue = metrics.iter().find(|m| m.name == "total_revenue").unwrap();
        assert!((revenue.value - 500.0).abs() < f64::EPSILON);
        assert_eq!(revenue.unit, MetricUnit::Currency);
    }

    #[tokio::test]
    async fn test_dispatch_payment_approved_without_amount_adds_zero_revenue() {
        let repo = InMemoryMetricRepository::new();
        let clock = FixedClock(now());
        let event = event("payments", "PaymentApproved", json!({}));

        let metrics = dispatch(&event, &clock, &repo).await.unwrap();

        let revenue = metrics.iter().find(|m| m.name == "total_revenue").unwrap();
        assert!(revenue.value.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_category_is_a_no_op() {
        // FailingMetricRepository proves the store is never touched.
        let clock = FixedClock(now());
        let event = event("orders", "OrderCreated", json!({}));

        let metrics = dispatch(&event, &clock, &FailingMetricRepository).await.unwrap();

        assert!(metrics.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_unknown_type_in_known_category_is_a_no_op() {
        let clock = FixedClock(now());
        let event = event("payments", "PaymentDisputed", json!({}));

        let metrics = dispatch(&event, &clock, &FailingMetricRepository).await.unwrap();

        assert!(metrics.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_propagates_store_failure() {
        let clock = FixedClock(now());
        let event = event("requests", "RequestCreated", json!({}));

        let result = dispatch(&event, &clock, &FailingMetricRepository).await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }
}
