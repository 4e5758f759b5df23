//! Tally Event Store: PostgreSQL implementations of the storage traits.

use sqlx::migrate::Migrator;
use tally_core::error::DomainError;

pub mod pg_event_repository;
pub mod pg_metric_repository;

/// Schema migrations for both record kinds.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

fn infrastructure(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(err.to_string())
}
