//! `PostgreSQL` implementation of the `MetricRepository` trait.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::debug;

use tally_core::error::DomainError;
use tally_core::metric::{Metric, MetricPeriod, MetricUnit};
use tally_core::repository::{MetricRepository, TimeWindow};

use crate::infrastructure;

/// PostgreSQL-backed metric repository.
#[derive(Debug, Clone)]
pub struct PgMetricRepository {
    pool: PgPool,
}

impl PgMetricRepository {
    /// Creates a new `PgMetricRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(message.into())
}

fn metric_from_row(row: &PgRow) -> Result<Metric, sqlx::Error> {
    let unit: String = row.try_get("unit")?;
    let period: String = row.try_get("period")?;

    Ok(Metric {
        id: row.try_get("metric_id")?,
        name: row.try_get("name")?,
        value: row.try_get("value")?,
        unit: MetricUnit::from_tag(&unit)
            .ok_or_else(|| decode_error(format!("unknown metric unit: {unit}")))?,
        period: MetricPeriod::from_tag(&period)
            .ok_or_else(|| decode_error(format!("unknown metric period: {period}")))?,
        timestamp: row.try_get("recorded_at")?,
        metadata: row.try_get("metadata")?,
    })
}

#[async_trait]
impl MetricRepository for PgMetricRepository {
    async fn append_metrics(&self, metrics: &[Metric]) -> Result<(), DomainError> {
        if metrics.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(infrastructure)?;
        for metric in metrics {
            sqlx::query(
                "INSERT INTO metrics (metric_id, name, value, unit, period, recorded_at, metadata) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(metric.id)
            .bind(&metric.name)
            .bind(metric.value)
            .bind(metric.unit.as_str())
            .bind(metric.period.as_str())
            .bind(metric.timestamp)
            .bind(&metric.metadata)
            .execute(&mut *tx)
            .await
            .map_err(infrastructure)?;
        }
        tx.commit().await.map_err(infrastructure)?;

        debug!(count = metrics.len(), "metrics inserted");
        Ok(())
    }

    async fn load_metrics(
        &self,
        name: &str,
        window: Option<TimeWindow>,
    ) -> Result<Vec<Metric>, DomainError> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT metric_id, name, value, unit, period, recorded_at, metadata \
             FROM metrics WHERE name = ",
        );
        query.push_bind(name.to_owned());
        if let Some(window) = window {
            query
                .push(" AND recorded_at >= ")
                .push_bind(window.from)
                .push(" AND recorded_at < ")
                .push_bind(window.to);
        }
        query.push(" ORDER BY recorded_at, metric_id");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)?;

        rows.iter()
            .map(metric_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(infrastructure)
    }
}
