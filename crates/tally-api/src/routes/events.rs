//! Read-side routes over stored events.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use tally_core::repository::{EventFilter, PageRequest};
use tally_ingestion::application::query_handlers::{self, EventView, Pagination};

use crate::error::ApiError;
use crate::extract::{ApiPath, ApiQuery};
use crate::state::AppState;

/// Query string for GET /events. Every filter is an optional equality match.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size, clamped to `1..=100`.
    pub limit: Option<u32>,
    /// Category label as stored.
    pub category: Option<String>,
    /// Topic as stored.
    pub topic: Option<String>,
    /// Event type, sent as `type`.
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    /// `true` or `false`.
    pub processed: Option<bool>,
    /// `direct-webhook` or `core-hub`.
    pub source: Option<String>,
    /// Upstream message identifier.
    pub message_id: Option<String>,
    /// Caller-supplied correlation identifier.
    pub correlation_id: Option<String>,
}

impl EventsQuery {
    fn into_parts(self) -> (EventFilter, PageRequest) {
        let page = PageRequest::new(self.page, self.limit);
        let filter = EventFilter {
            category: self.category,
            topic: self.topic,
            event_type: self.event_type,
            processed: self.processed,
            source: self.source,
            message_id: self.message_id,
            correlation_id: self.correlation_id,
        };
        (filter, page)
    }
}

/// Response body for GET /events.
#[derive(Debug, Serialize)]
pub struct EventListResponse {
    /// Always `true`.
    pub success: bool,
    /// The requested page, newest first.
    pub data: Vec<EventView>,
    /// Page position and totals.
    pub pagination: Pagination,
}

/// Response body for GET /events/{event_id}.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    /// Always `true`.
    pub success: bool,
    /// The stored event.
    pub data: EventView,
}

/// GET /events
#[instrument(skip(state))]
async fn list_events(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EventsQuery>,
) -> Result<Json<EventListResponse>, ApiError> {
    let (filter, page) = query.into_parts();
    let result = query_handlers::list_events(&filter, page, &*state.event_repository).await?;

    Ok(Json(EventListResponse {
        success: true,
        data: result.events,
        pagination: result.pagination,
    }))
}

/// GET /events/{event_id}
#[instrument(skip(state))]
async fn get_event(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<Uuid>,
) -> Result<Json<EventResponse>, ApiError> {
    let view = query_handlers::get_event_by_id(event_id, &*state.event_repository).await?;

    Ok(Json(EventResponse {
        success: true,
        data: view,
    }))
}

/// Returns the event query router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events/{event_id}", get(get_event))
}
