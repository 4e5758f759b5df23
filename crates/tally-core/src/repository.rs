//! Storage abstractions for events and metric observations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::Event;
use crate::metric::Metric;

/// Default page size for event listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Largest page size accepted for event listings.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Equality filters for event listings. All set fields are AND-combined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Match on category.
    pub category: Option<String>,
    /// Match on topic.
    pub topic: Option<String>,
    /// Match on event type.
    pub event_type: Option<String>,
    /// Match on the processed flag.
    pub processed: Option<bool>,
    /// Match on the ingestion source tag.
    pub source: Option<String>,
    /// Match on the upstream message identifier.
    pub message_id: Option<String>,
    /// Match on the correlation identifier.
    pub correlation_id: Option<String>,
}

impl EventFilter {
    /// Returns `true` if `event` satisfies every set filter.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        fn eq(filter: Option<&String>, value: &str) -> bool {
            filter.is_none_or(|f| f == value)
        }
        fn eq_opt(filter: Option<&String>, value: Option<&String>) -> bool {
            filter.is_none_or(|f| value == Some(f))
        }

        eq(self.category.as_ref(), &event.category)
            && eq(self.topic.as_ref(), &event.topic)
            && eq(self.event_type.as_ref(), &event.event_type)
            && self.processed.is_none_or(|p| p == event.is_processed())
            && eq(self.source.as_ref(), event.source.as_str())
            && eq_opt(self.message_id.as_ref(), event.message_id.as_ref())
            && eq_opt(self.correlation_id.as_ref(), event.correlation_id.as_ref())
    }
}

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
}

impl PageRequest {
    /// Builds a page request, defaulting absent values and clamping the limit
    /// to `1..=MAX_PAGE_LIMIT`.
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(DEFAULT_PAGE_LIMIT)
                .clamp(1, MAX_PAGE_LIMIT),
        }
    }

    /// Number of records to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// Total number of pages for `total` records.
    #[must_use]
    pub fn pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.limit))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Half-open `[from, to)` timestamp range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Inclusive lower bound.
    pub from: DateTime<Utc>,
    /// Exclusive upper bound.
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    /// Returns `true` if `at` falls within the window.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at < self.to
    }
}

/// Durable store of ingested events.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Insert a new event.
    async fn create_event(&self, event: &Event) -> Result<(), DomainError>;

    /// Flip an event from unprocessed to processed.
    ///
    /// Fails with `DomainError::NotFound` for unknown ids and
    /// `DomainError::AlreadyProcessed` if the transition already happened.
    async fn mark_processed(&self, event_id: Uuid) -> Result<(), DomainError>;

    /// Load a single event.
    async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>, DomainError>;

    /// List events matching `filter`, newest first, together with the total
    /// number of matching records.
    async fn list_events(
        &self,
        filter: &EventFilter,
        page: PageRequest,
    ) -> Result<(Vec<Event>, u64), DomainError>;
}

/// Append-only store of metric observations.
#[async_trait]
pub trait MetricRepository: Send + Sync {
    /// Append observations. Either all of them are stored or none is.
    async fn append_metrics(&self, metrics: &[Metric]) -> Result<(), DomainError>;

    /// Load every observation named `name`, optionally restricted to
    /// `window` on the timestamp.
    async fn load_metrics(
        &self,
        name: &str,
        window: Option<TimeWindow>,
    ) -> Result<Vec<Metric>, DomainError>;
}
