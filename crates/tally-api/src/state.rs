//! Shared application state.

use std::sync::Arc;

use tally_core::clock::Clock;
use tally_core::repository::{EventRepository, MetricRepository};
use tally_core::subscription::SubscriptionManager;
use tally_ingestion::application::ingestion::SignaturePolicy;

/// Application state shared across all request handlers.
///
/// Store handles are built once at start-up and passed in, so tests can swap
/// in the in-memory repositories.
#[derive(Clone)]
pub struct AppState {
    /// Clock for timestamps and the default summary day.
    pub clock: Arc<dyn Clock + Send + Sync>,
    /// Event store.
    pub event_repository: Arc<dyn EventRepository>,
    /// Metric store.
    pub metric_repository: Arc<dyn MetricRepository>,
    /// Core hub subscription collaborator.
    pub subscription_manager: Arc<dyn SubscriptionManager>,
    /// Signature requirements for core hub deliveries.
    pub signature_policy: SignaturePolicy,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock + Send + Sync>,
        event_repository: Arc<dyn EventRepository>,
        metric_repository: Arc<dyn MetricRepository>,
        subscription_manager: Arc<dyn SubscriptionManager>,
        signature_policy: SignaturePolicy,
    ) -> Self {
        Self {
            clock,
            event_repository,
            metric_repository,
            subscription_manager,
            signature_policy,
        }
    }
}
