//! Aggregation queries over metric observations.
//!
//! Every aggregate is a sum recomputed from the append-only store. Summaries
//! are compositions of [`sum_metric`] calls, one per metric the routing
//! table can emit for a category.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use tally_core::clock::Clock;
use tally_core::error::DomainError;
use tally_core::metric::{MetricPeriod, MetricUnit};
use tally_core::repository::{MetricRepository, TimeWindow};

use crate::domain::routing::{self, Category};

/// Returns the UTC window `[day 00:00, day+1 00:00)`.
#[must_use]
pub fn day_window(day: NaiveDate) -> TimeWindow {
    let from: DateTime<Utc> = day.and_time(NaiveTime::default()).and_utc();
    TimeWindow {
        from,
        to: from + Duration::days(1),
    }
}

/// Sums every observation named `name`, optionally only those timestamped on
/// `day` (UTC). Returns `0.0` when nothing matches.
///
/// # Errors
///
/// Returns the store's `DomainError` if loading fails.
pub async fn sum_metric(
    name: &str,
    day: Option<NaiveDate>,
    repo: &dyn MetricRepository,
) -> Result<f64, DomainError> {
    let metrics = repo.load_metrics(name, day.map(day_window)).await?;
    Ok(metrics.iter().map(|m| m.value).sum())
}

/// One summed metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricTotal {
    /// Metric name.
    pub name: &'static str,
    /// Unit tag.
    pub unit: MetricUnit,
    /// Combination semantics that selected the summing window.
    pub period: MetricPeriod,
    /// Sum of observations.
    pub total: f64,
}

/// All metrics of one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainSummary {
    /// Category slug.
    pub category: &'static str,
    /// Metric totals in routing-table order.
    pub metrics: Vec<MetricTotal>,
}

/// Per-domain metric bundles for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    /// Day used for `daily` metrics.
    pub date: NaiveDate,
    /// One entry per category.
    pub domains: Vec<DomainSummary>,
}

/// Sums every metric of `category`. `incremental` metrics are summed over
/// all time and `daily` metrics over `day`.
///
/// # Errors
///
/// Returns the store's `DomainError` if loading fails.
pub async fn domain_summary(
    category: Category,
    day: NaiveDate,
    repo: &dyn MetricRepository,
) -> Result<DomainSummary, DomainError> {
    let mut metrics = Vec::new();
    for (name, unit, period) in routing::metrics_for(category) {
        let window = match period {
            MetricPeriod::Incremental => None,
            MetricPeriod::Daily => Some(day),
        };
        metrics.push(MetricTotal {
            name,
            unit,
            period,
            total: sum_metric(name, window, repo).await?,
        });
    }
    Ok(DomainSummary {
        category: category.slug(),
        metrics,
    })
}

/// Builds the summary of every category. `day` defaults to today according
/// to `clock`.
///
/// # Errors
///
/// Returns the store's `DomainError` if loading fails.
pub async fn metrics_summary(
    day: Option<NaiveDate>,
    clock: &dyn Clock,
    repo: &dyn MetricRepository,
) -> Result<MetricsSummary, DomainError> {
    let date = day.unwrap_or_else(|| clock.today());
    let mut domains = Vec::with_capacity(Category::ALL.len());
    for category in Category::ALL {
        domains.push(domain_summary(category, date, repo).await?);
    }
    Ok(MetricsSummary { date, domains })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tally_core::metric::Metric;
    use tally_test_support::{FailingMetricRepository, FixedClock, InMemoryMetricRepository};
    use uuid::Uuid;

    use super::*;

    fn observation(name: &str, value: f64, timestamp: DateTime<Utc>) -> Metric {
        Metric {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            value,
            unit: MetricUnit::Count,
            period: MetricPeriod::Incremental,
            timestamp,
            metadata: None,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_sum_of_n_unit_observations_is_n() {
        // Arrange
        let repo = InMemoryMetricRepository::new();
        let metrics: Vec<Metric> = (0..7).map(|_| observation("total_users", 1.0, at(15, 10))).collect();
        repo.append_metrics(&metrics).await.unwrap();

        // Act
        let total = sum_metric("total_users", None, &repo).await.unwrap();

        // Assert
        assert!((total - 7.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_increment_then_decrement_sums_to_zero() {
        let repo = InMemoryMetricRepository::new();
        repo.append_metrics(&[
            observation("pending_requests", 1.0, at(15, 10)),
            observation("pending_requests", -1.0, at(15, 11)),
        ])
        .await
        .unwrap();

        let total = sum_metric("pending_requests", None, &repo).await.unwrap();

        assert!(total.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_sum_of_unknown_metric_is_zero() {
        let repo = InMemoryMetricRepository::new();

        let total = sum_metric("never_emitted", None, &repo).await.unwrap();

        assert!(total.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_day_filter_keeps_only_that_utc_day() {
        let repo = InMemoryMetricRepository::new();
        repo.append_metrics(&[
            observation("new_users_today", 1.0, at(14, 23)),
            observation("new_users_today", 1.0, at(15, 0)),
            observation("new_users_today", 1.0, at(15, 23)),
            observation("new_users_today", 1.0, at(16, 0)),
        ])
        .await
        .unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();

        let total = sum_metric("new_users_today", Some(day), &repo).await.unwrap();

        assert!((total - 2.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_summary_sums_daily_metrics_for_today_only() {
        // Arrange
        let repo = InMemoryMetricRepository::new();
        repo.append_metrics(&[
            observation("total_users", 1.0, at(14, 9)),
            observation("new_users_today", 1.0, at(14, 9)),
            observation("total_users", 1.0, at(15, 9)),
            observation("new_users_today", 1.0, at(15, 9)),
            observation("total_revenue", 250.5, at(15, 9)),
        ])
        .await
        .unwrap();
        let clock = FixedClock(at(15, 12));

        // Act
        let summary = metrics_summary(None, &clock, &repo).await.unwrap();

        // Assert
        assert_eq!(summary.date, NaiveDate::from_ymd_opt(2026, 1, 15).unwrap());
        assert_eq!(summary.domains.len(), 5);
        let users = &summary.domains[0];
        assert_eq!(users.category, "users");
        let total = |domain: &DomainSummary, name: &str| {
            domain.metrics.iter().find(|m| m.name == name).unwrap().total
        };
        assert!((total(users, "total_users") - 2.0).abs() < f64::EPSILON);
        assert!((total(users, "new_users_today") - 1.0).abs() < f64::EPSILON);
        let payments = summary.domains.iter().find(|d| d.category == "payments").unwrap();
        assert!((total(payments, "total_revenue") - 250.5).abs() < f64::EPSILON);
        assert!(total(payments, "failed_payments").abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_summary_propagates_store_failure() {
        let clock = FixedClock(at(15, 12));

        let result = metrics_summary(None, &clock, &FailingMetricRepository).await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }
}
