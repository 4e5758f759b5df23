//! Aggregated metric reads.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tally_ingestion::application::aggregation::{self, MetricsSummary};

use crate::error::ApiError;
use crate::extract::{ApiPath, ApiQuery};
use crate::state::AppState;

/// Query string shared by the metric routes.
#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    /// UTC day, `YYYY-MM-DD`.
    pub date: Option<NaiveDate>,
}

/// Sum of one metric.
#[derive(Debug, Serialize)]
pub struct MetricTotalView {
    /// Metric name from the path.
    pub name: String,
    /// Day the sum is restricted to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Sum of the matching observations.
    pub total: f64,
}

/// Response body for GET /metrics/{name}.
#[derive(Debug, Serialize)]
pub struct MetricTotalResponse {
    /// Always `true`.
    pub success: bool,
    /// The computed total.
    pub data: MetricTotalView,
}

/// Response body for GET /metrics/summary.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    /// Always `true`.
    pub success: bool,
    /// Per-category rollup for the day.
    pub data: MetricsSummary,
}

/// GET /metrics/{name}
///
/// Without `date` the sum covers every observation.
#[instrument(skip(state))]
async fn metric_total(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> Result<Json<MetricTotalResponse>, ApiError> {
    let total = aggregation::sum_metric(&name, query.date, &*state.metric_repository).await?;

    Ok(Json(MetricTotalResponse {
        success: true,
        data: MetricTotalView {
            name,
            date: query.date,
            total,
        },
    }))
}

/// GET /metrics/summary
#[instrument(skip(state))]
async fn metrics_summary(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let summary = aggregation::metrics_summary(
        query.date,
        state.clock.as_ref(),
        &*state.metric_repository,
    )
    .await?;

    Ok(Json(SummaryResponse {
        success: true,
        data: summary,
    }))
}

/// Returns the metrics router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/metrics/summary", get(metrics_summary))
        .route("/metrics/{name}", get(metric_total))
}
