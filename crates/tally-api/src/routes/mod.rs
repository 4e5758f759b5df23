//! Route modules.

use axum::Router;

use crate::state::AppState;

pub mod events;
pub mod health;
pub mod metrics;
pub mod subscription;
pub mod webhook;

/// Returns every route of the service.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(webhook::router())
        .merge(events::router())
        .merge(metrics::router())
        .merge(subscription::router())
}
