//! Ingested event records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Placeholder used for category, topic and type when the inbound payload
/// does not carry them.
pub const UNKNOWN: &str = "unknown";

/// Which ingestion path produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventSource {
    /// `POST /webhook`, trusted internal callers.
    #[serde(rename = "direct-webhook")]
    DirectWebhook,
    /// `POST /webhook/core-hub`, deliveries from the core hub.
    #[serde(rename = "core-hub")]
    CoreHub,
}

impl EventSource {
    /// Returns the wire tag stored alongside the event.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DirectWebhook => "direct-webhook",
            Self::CoreHub => "core-hub",
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventSource {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct-webhook" => Ok(Self::DirectWebhook),
            "core-hub" => Ok(Self::CoreHub),
            other => Err(DomainError::Validation(format!(
                "unknown event source: {other}"
            ))),
        }
    }
}

/// The two persisted states of an event.
///
/// An event is created `Unprocessed` and moves to `Processed` exactly once,
/// after its metrics were dispatched. An event whose dispatch failed stays
/// `Unprocessed` for manual reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    /// Persisted, metrics not (yet) confirmed.
    Unprocessed,
    /// Metrics dispatched and the flag persisted.
    Processed,
}

impl ProcessingState {
    /// Returns `true` for the `Processed` state.
    #[must_use]
    pub fn is_processed(self) -> bool {
        matches!(self, Self::Processed)
    }
}

impl From<bool> for ProcessingState {
    fn from(processed: bool) -> Self {
        if processed {
            Self::Processed
        } else {
            Self::Unprocessed
        }
    }
}

/// The single internal shape every inbound wire shape is normalized into.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalEvent {
    /// Owning domain (e.g. "Users and Roles", "payments").
    pub category: String,
    /// Coarse classification within the category.
    pub topic: String,
    /// Specific event name (e.g. "UserCreated").
    pub event_type: String,
    /// Opaque structured payload.
    pub body: serde_json::Value,
    /// When the event happened upstream.
    pub occurred_at: DateTime<Utc>,
    /// Optional cross-system correlation identifier.
    pub correlation_id: Option<String>,
    /// Optional upstream message identifier.
    pub message_id: Option<String>,
    /// Ingestion path that produced this event.
    pub source: EventSource,
}

/// A persisted event record.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,
    /// Owning domain.
    pub category: String,
    /// Coarse classification within the category.
    pub topic: String,
    /// Specific event name.
    pub event_type: String,
    /// Opaque structured payload.
    pub payload: serde_json::Value,
    /// When the event happened upstream.
    pub occurred_at: DateTime<Utc>,
    /// Processing state; see [`ProcessingState`].
    pub state: ProcessingState,
    /// Optional cross-system correlation identifier.
    pub correlation_id: Option<String>,
    /// Optional upstream message identifier.
    pub message_id: Option<String>,
    /// Ingestion path that produced this event.
    pub source: EventSource,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Creates a new unprocessed event from a canonical event.
    #[must_use]
    pub fn new(id: Uuid, canonical: CanonicalEvent, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            category: canonical.category,
            topic: canonical.topic,
            event_type: canonical.event_type,
            payload: canonical.body,
            occurred_at: canonical.occurred_at,
            state: ProcessingState::Unprocessed,
            correlation_id: canonical.correlation_id,
            message_id: canonical.message_id,
            source: canonical.source,
            created_at,
        }
    }

    /// Returns `true` once metrics for this event were dispatched.
    #[must_use]
    pub fn is_processed(&self) -> bool {
        self.state.is_processed()
    }

    /// Performs the `unprocessed → processed` transition.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AlreadyProcessed` if the event was already
    /// processed.
    pub fn mark_processed(&mut self) -> Result<(), DomainError> {
        if self.is_processed() {
            return Err(DomainError::AlreadyProcessed(self.id));
        }
        self.state = ProcessingState::Processed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn canonical() -> CanonicalEvent {
        CanonicalEvent {
            category: "Users and Roles".to_owned(),
            topic: "users".to_owned(),
            event_type: "UserCreated".to_owned(),
            body: serde_json::json!({"id": 7}),
            occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap(),
            correlation_id: Some("corr-1".to_owned()),
            message_id: None,
            source: EventSource::DirectWebhook,
        }
    }

    #[test]
    fn test_new_event_starts_unprocessed() {
        let created_at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();

        let event = Event::new(Uuid::new_v4(), canonical(), created_at);

        assert_eq!(event.state, ProcessingState::Unprocessed);
        assert_eq!(event.category, "Users and Roles");
        assert_eq!(event.payload, serde_json::json!({"id": 7}));
        assert_eq!(event.created_at, created_at);
    }

    #[test]
    fn test_mark_processed_transitions_once() {
        let mut event = Event::new(Uuid::new_v4(), canonical(), Utc::now());

        event.mark_processed().unwrap();
        assert!(event.is_processed());

        match event.mark_processed() {
            Err(DomainError::AlreadyProcessed(id)) => assert_eq!(id, event.id),
            other => panic!("expected AlreadyProcessed, got {other:?}"),
        }
    }

    #[test]
    fn test_event_source_round_trips_through_wire_tag() {
        for source in [EventSource::DirectWebhook, EventSource::CoreHub] {
            assert_eq!(source.as_str().parse::<EventSource>().unwrap(), source);
        }
        assert!("sqs".parse::<EventSource>().is_err());
    }
}
