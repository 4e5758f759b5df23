//! Subscription status backed by static configuration.

use async_trait::async_trait;
use tally_core::error::DomainError;
use tally_core::subscription::{SubscriptionManager, SubscriptionStatus};

use crate::config::HubConfig;

/// Reports the subscription described by the server configuration.
#[derive(Debug, Clone)]
pub struct ConfiguredSubscriptionManager {
    status: SubscriptionStatus,
}

impl ConfiguredSubscriptionManager {
    /// Builds the manager from hub settings. The subscription is active when
    /// a hub URL and at least one channel are configured.
    #[must_use]
    pub fn new(hub: &HubConfig, signature_verification: bool) -> Self {
        Self {
            status: SubscriptionStatus {
                active: hub.hub_url.is_some() && !hub.channels.is_empty(),
                hub_url: hub.hub_url.clone(),
                callback_url: hub.callback_url.clone(),
                channels: hub.channels.clone(),
                signature_verification,
            },
        }
    }
}

#[async_trait]
impl SubscriptionManager for ConfiguredSubscriptionManager {
    async fn status(&self) -> Result<SubscriptionStatus, DomainError> {
        Ok(self.status.clone())
    }
}
