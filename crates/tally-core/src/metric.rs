//! Metric observation records.
//!
//! Metrics are append-only. Aggregates are always computed by summing the
//! matching observations, never by mutating a stored counter.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unit tag of a metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    /// A plain count of occurrences.
    Count,
    /// A monetary amount.
    Currency,
}

impl MetricUnit {
    /// Returns the stored tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Currency => "currency",
        }
    }

    /// Parses a stored tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "count" => Some(Self::Count),
            "currency" => Some(Self::Currency),
            _ => None,
        }
    }
}

impl fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How observations of a metric combine.
///
/// This classifies the metric; it is not a time-range filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricPeriod {
    /// Summed over all time.
    Incremental,
    /// Summed within a single UTC day.
    Daily,
}

impl MetricPeriod {
    /// Returns the stored tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Incremental => "incremental",
            Self::Daily => "daily",
        }
    }

    /// Parses a stored tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "incremental" => Some(Self::Incremental),
            "daily" => Some(Self::Daily),
            _ => None,
        }
    }
}

impl fmt::Display for MetricPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One appended metric observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Unique metric identifier.
    pub id: Uuid,
    /// Metric identity (e.g. `total_users`).
    pub name: String,
    /// Observed delta; may be fractional or negative.
    pub value: f64,
    /// Unit tag.
    pub unit: MetricUnit,
    /// Combination semantics.
    pub period: MetricPeriod,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Free-form annotation, not interpreted by the pipeline.
    pub metadata: Option<serde_json::Value>,
}
