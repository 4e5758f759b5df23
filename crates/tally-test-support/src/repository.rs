//! Test repositories: in-memory and failing implementations of the storage
//! traits.

use std::sync::Mutex;

use async_trait::async_trait;
use tally_core::error::DomainError;
use tally_core::event::Event;
use tally_core::metric::Metric;
use tally_core::repository::{
    EventFilter, EventRepository, MetricRepository, PageRequest, TimeWindow,
};
use uuid::Uuid;

/// An event repository backed by a `Vec`. Optionally refuses the
/// processed-flag update so tests can reach the "metrics emitted, event still
/// unprocessed" state.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    events: Mutex<Vec<Event>>,
    fail_mark_processed: bool,
}

impl InMemoryEventRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty repository whose `mark_processed` always fails.
    #[must_use]
    pub fn failing_mark_processed() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail_mark_processed: true,
        }
    }

    /// Returns a snapshot of all stored events, in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn create_event(&self, event: &Event) -> Result<(), DomainError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn mark_processed(&self, event_id: Uuid) -> Result<(), DomainError> {
        if self.fail_mark_processed {
            return Err(DomainError::Infrastructure("connection reset".into()));
        }
        let mut events = self.events.lock().unwrap();
        let event = events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or(DomainError::NotFound(event_id))?;
        event.mark_processed()
    }

    async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>, DomainError> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == event_id)
            .cloned())
    }

    async fn list_events(
        &self,
        filter: &EventFilter,
        page: PageRequest,
    ) -> Result<(Vec<Event>, u64), DomainError> {
        let events = self.events.lock().unwrap();
        let matching: Vec<&Event> = events.iter().rev().filter(|e| filter.matches(e)).collect();
        let total = matching.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = page.limit as usize;
        let page_events = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok((page_events, total))
    }
}

/// A metric repository backed by a `Vec`.
#[derive(Debug, Default)]
pub struct InMemoryMetricRepository {
    metrics: Mutex<Vec<Metric>>,
}

impl InMemoryMetricRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all appended metrics, in append order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn metrics(&self) -> Vec<Metric> {
        self.metrics.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricRepository for InMemoryMetricRepository {
    async fn append_metrics(&self, metrics: &[Metric]) -> Result<(), DomainError> {
        self.metrics.lock().unwrap().extend_from_slice(metrics);
        Ok(())
    }

    async fn load_metrics(
        &self,
        name: &str,
        window: Option<TimeWindow>,
    ) -> Result<Vec<Metric>, DomainError> {
        Ok(self
            .metrics
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.name == name)
            .filter(|m| window.is_none_or(|w| w.contains(m.timestamp)))
            .cloned()
            .collect())
    }
}

/// An event repository that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventRepository;

#[async_trait]
impl EventRepository for FailingEventRepository {
    async fn create_event(&self, _event: &Event) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn mark_processed(&self, _event_id: Uuid) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn get_event(&self, _event_id: Uuid) -> Result<Option<Event>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn list_events(
        &self,
        _filter: &EventFilter,
        _page: PageRequest,
    ) -> Result<(Vec<Event>, u64), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// A metric repository that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingMetricRepository;

#[async_trait]
impl MetricRepository for FailingMetricRepository {
    async fn append_metrics(&self, _metrics: &[Metric]) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn load_metrics(
        &self,
        _name: &str,
        _window: Option<TimeWindow>,
    ) -> Result<Vec<Metric>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
