//! Core hub subscription status.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::DomainError;

/// Snapshot of this service's subscription to the core hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    /// Whether a hub subscription is configured.
    pub active: bool,
    /// Hub base URL.
    pub hub_url: Option<String>,
    /// URL the hub delivers to.
    pub callback_url: Option<String>,
    /// Channels subscribed to.
    pub channels: Vec<String>,
    /// Whether inbound deliveries are signature-checked.
    pub signature_verification: bool,
}

/// Collaborator that owns the core hub subscription.
#[async_trait]
pub trait SubscriptionManager: Send + Sync {
    /// Report the current subscription status.
    async fn status(&self) -> Result<SubscriptionStatus, DomainError>;
}
