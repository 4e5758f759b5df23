//! Time source for ingestion timestamps and daily metric windows.

use chrono::{DateTime, NaiveDate, Utc};

/// Supplies "now" to the pipeline. Injected so tests control which UTC day
/// daily metrics land in.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;

    /// The current UTC calendar day, the default window for daily metrics.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
