//! Core hub subscription status.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tally_core::subscription::SubscriptionStatus;
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

/// Response body for GET /subscription-status.
#[derive(Debug, Serialize)]
pub struct SubscriptionStatusResponse {
    /// Always `true`.
    pub success: bool,
    /// Current subscription state.
    pub data: SubscriptionStatus,
    /// When the status was read.
    pub timestamp: DateTime<Utc>,
}

/// GET /subscription-status
#[instrument(skip(state))]
async fn subscription_status(
    State(state): State<AppState>,
) -> Result<Json<SubscriptionStatusResponse>, ApiError> {
    let status = state.subscription_manager.status().await?;

    Ok(Json(SubscriptionStatusResponse {
        success: true,
        data: status,
        timestamp: state.clock.now(),
    }))
}

/// Returns the subscription router.
pub fn router() -> Router<AppState> {
    Router::new().route("/subscription-status", get(subscription_status))
}
