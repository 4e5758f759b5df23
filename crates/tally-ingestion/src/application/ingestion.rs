//! Ingestion gateway: the per-request pipeline.
//!
//! ```text
//! received → [verifying] → normalized → persisted(unprocessed)
//!          → dispatched → persisted(processed) → responded
//! ```
//!
//! Verification runs only for core hub deliveries and only when a
//! [`SignaturePolicy`] is enforcing a secret. A failed verification stops the
//! request before anything is stored. Once the event is persisted it is never
//! removed: if dispatch or the processed-flag update fails, the event stays
//! `unprocessed`. Metrics are emitted at least once, not exactly once.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tally_core::clock::Clock;
use tally_core::error::DomainError;
use tally_core::event::{CanonicalEvent, Event, EventSource};
use tally_core::repository::{EventRepository, MetricRepository};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::dispatcher;
use crate::domain::{normalizer, signature};

/// Stages a request moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngestionStage {
    /// The raw request has been accepted by the transport.
    Received,
    /// The signature is being checked.
    Verifying,
    /// The payload has been normalized into a canonical event.
    Normalized,
    /// The event has been stored with `processed = false`.
    Persisted,
    /// Metrics have been appended.
    Dispatched,
    /// The event has been stored with `processed = true`.
    Processed,
}

/// Signature requirements for core hub deliveries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignaturePolicy {
    secret: Option<String>,
    enforce: bool,
}

impl SignaturePolicy {
    /// Creates a policy. Blank secrets count as no secret.
    #[must_use]
    pub fn new(secret: Option<String>, enforce: bool) -> Self {
        Self {
            secret: secret.filter(|s| !s.trim().is_empty()),
            enforce,
        }
    }

    /// A policy that never verifies.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Returns the secret to verify with, if verification applies.
    #[must_use]
    pub fn active_secret(&self) -> Option<&str> {
        if self.enforce {
            self.secret.as_deref()
        } else {
            None
        }
    }

    /// Returns `true` if deliveries are signature-checked.
    #[must_use]
    pub fn is_enforced(&self) -> bool {
        self.active_secret().is_some()
    }
}

/// Successful outcome of an ingestion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionReceipt {
    /// Identifier of the stored event.
    pub event_id: Uuid,
    /// Upstream message identifier, for core hub deliveries.
    pub message_id: Option<String>,
    /// Number of metric observations appended.
    pub metrics_emitted: usize,
}

/// Why an ingestion request failed.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The core hub signature was missing or wrong. Nothing was stored.
    #[error("invalid webhook signature")]
    InvalidSignature,

    /// The event could not be stored. Nothing was stored.
    #[error("failed to persist event: {0}")]
    Persistence(#[source] DomainError),

    /// Metric dispatch failed. The event is stored unprocessed.
    #[error("metric dispatch failed for event {event_id}: {source}")]
    Dispatch {
        /// The stored, unprocessed event.
        event_id: Uuid,
        /// Underlying failure.
        source: DomainError,
    },

    /// Metrics were appended but the processed flag could not be stored.
    #[error("failed to mark event {event_id} as processed: {source}")]
    MarkProcessed {
        /// The stored, unprocessed event.
        event_id: Uuid,
        /// Underlying failure.
        source: DomainError,
    },
}

impl IngestError {
    /// The last stage the request reached before failing.
    #[must_use]
    pub fn stage(&self) -> IngestionStage {
        match self {
            Self::InvalidSignature => IngestionStage::Verifying,
            Self::Persistence(_) => IngestionStage::Normalized,
            Self::Dispatch { .. } => IngestionStage::Persisted,
            Self::MarkProcessed { .. } => IngestionStage::Dispatched,
        }
    }

    /// The stored event, if the request got that far.
    #[must_use]
    pub fn event_id(&self) -> Option<Uuid> {
        match self {
            Self::InvalidSignature | Self::Persistence(_) => None,
            Self::Dispatch { event_id, .. } | Self::MarkProcessed { event_id, .. } => {
                Some(*event_id)
            }
        }
    }
}

/// Handles a `POST /webhook` delivery. Direct callers are trusted and never
/// signature-checked.
///
/// # Errors
///
/// Returns `IngestError` if persistence, dispatch or the processed-flag
/// update fails.
pub async fn handle_direct_webhook(
    raw_body: &[u8],
    clock: &dyn Clock,
    events: &dyn EventRepository,
    metrics: &dyn MetricRepository,
) -> Result<IngestionReceipt, IngestError> {
    let now = clock.now();
    let raw = parse_lenient(raw_body);
    if let Some(queue) = raw["queue"].as_str() {
        info!(queue, "direct webhook received");
    }

    let canonical = normalizer::normalize(EventSource::DirectWebhook, &raw, now);
    run_pipeline(canonical, now, clock, events, metrics).await
}

/// Handles a `POST /webhook/core-hub` delivery, verifying `signature` over
/// the exact raw body when `policy` requires it.
///
/// # Errors
///
/// Returns `IngestError::InvalidSignature` if verification fails, otherwise
/// `IngestError` if persistence, dispatch or the processed-flag update fails.
pub async fn handle_core_hub_webhook(
    raw_body: &[u8],
    signature_header: Option<&str>,
    policy: &SignaturePolicy,
    clock: &dyn Clock,
    events: &dyn EventRepository,
    metrics: &dyn MetricRepository,
) -> Result<IngestionReceipt, IngestError> {
    if let Some(secret) = policy.active_secret() {
        if !signature::verify(raw_body, signature_header, secret) {
            warn!(
                signature_present = signature_header.is_some(),
                "rejecting core hub delivery with invalid signature"
            );
            return Err(IngestError::InvalidSignature);
        }
    }

    let now = clock.now();
    let raw = parse_lenient(raw_body);
    let canonical = normalizer::normalize(EventSource::CoreHub, &raw, now);
    run_pipeline(canonical, now, clock, events, metrics).await
}

/// Bodies that are not JSON are kept verbatim as a string so they still
/// produce a stored event.
fn parse_lenient(raw_body: &[u8]) -> Value {
    serde_json::from_slice(raw_body).unwrap_or_else(|e| {
        warn!(error = %e, "webhook body is not valid JSON, storing it verbatim");
        Value::String(String::from_utf8_lossy(raw_body).into_owned())
    })
}

async fn run_pipeline(
    canonical: CanonicalEvent,
    received_at: DateTime<Utc>,
    clock: &dyn Clock,
    events: &dyn EventRepository,
    metrics: &dyn MetricRepository,
) -> Result<IngestionReceipt, IngestError> {
    let mut event = Event::new(Uuid::now_v7(), canonical, received_at);

    events.create_event(&event).await.map_err(|e| {
        error!(
            category = %event.category,
            event_type = %event.event_type,
            source = %event.source,
            error = %e,
            "failed to persist event"
        );
        IngestError::Persistence(e)
    })?;

    let emitted = dispatcher::dispatch(&event, clock, metrics)
        .await
        .map_err(|e| {
            error!(event_id = %event.id, error = %e, "metric dispatch failed, event left unprocessed");
            IngestError::Dispatch {
                event_id: event.id,
                source: e,
            }
        })?;

    let mark = match event.mark_processed() {
        Ok(()) => events.mark_processed(event.id).await,
        Err(e) => Err(e),
    };
    mark.map_err(|e| {
        error!(
            event_id = %event.id,
            metrics_emitted = emitted.len(),
            error = %e,
            "metrics emitted but event could not be marked processed"
        );
        IngestError::MarkProcessed {
            event_id: event.id,
            source: e,
        }
    })?;

    info!(
        event_id = %event.id,
        category = %event.category,
        event_type = %event.event_type,
        source = %event.source,
        metrics_emitted = emitted.len(),
        "event processed"
    );

    Ok(IngestionReceipt {
        event_id: event.id,
        message_id: event.message_id,
        metrics_emitted: emitted.len(),
    })
}
