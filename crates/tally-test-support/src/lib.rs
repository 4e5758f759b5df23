//! Shared test mocks and utilities for the Tally metrics pipeline.

mod clock;
mod repository;

pub use clock::{FixedClock, SteppingClock};
pub use repository::{
    FailingEventRepository, FailingMetricRepository, InMemoryEventRepository,
    InMemoryMetricRepository,
};
