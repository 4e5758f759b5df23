//! Query handlers for stored events.
//!
//! This module contains query handlers that read events from the store and
//! return read-only view DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tally_core::error::DomainError;
use tally_core::event::{Event, EventSource};
use tally_core::repository::{EventFilter, EventRepository, PageRequest};
use uuid::Uuid;

/// Read-only view of a stored event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    /// Event identifier.
    pub id: Uuid,
    /// Owning domain.
    pub category: String,
    /// Coarse classification.
    pub topic: String,
    /// Specific event name.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Stored payload.
    pub payload: serde_json::Value,
    /// When the event happened upstream.
    pub occurred_at: DateTime<Utc>,
    /// Whether metrics were dispatched.
    pub processed: bool,
    /// Correlation identifier.
    pub correlation_id: Option<String>,
    /// Upstream message identifier.
    pub message_id: Option<String>,
    /// Ingestion path.
    pub source: EventSource,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl From<Event> for EventView {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            processed: event.is_processed(),
            category: event.category,
            topic: event.topic,
            event_type: event.event_type,
            payload: event.payload,
            occurred_at: event.occurred_at,
            correlation_id: event.correlation_id,
            message_id: event.message_id,
            source: event.source,
            created_at: event.created_at,
        }
    }
}

/// Pagination block of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Total matching records.
    pub total: u64,
    /// Total pages.
    pub pages: u64,
}

/// One page of events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventPage {
    /// Events on this page, newest first.
    pub events: Vec<EventView>,
    /// Pagination details.
    pub pagination: Pagination,
}

/// Lists events matching `filter`.
///
/// # Errors
///
/// Returns the store's `DomainError` if loading fails.
pub async fn list_events(
    filter: &EventFilter,
    page: PageRequest,
    repo: &dyn EventRepository,
) -> Result<EventPage, DomainError> {
    let (events, total) = repo.list_events(filter, page).await?;
    Ok(EventPage {
        events: events.into_iter().map(EventView::from).collect(),
        pagination: Pagination {
            page: page.page,
            limit: page.limit,
            total,
            pages: page.pages(total),
        },
    })
}

/// Retrieves a single event.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if no event has this id.
pub async fn get_event_by_id(
    event_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<EventView, DomainError> {
    repo.get_event(event_id)
        .await?
        .map(EventView::from)
        .ok_or(DomainError::NotFound(event_id))
}
