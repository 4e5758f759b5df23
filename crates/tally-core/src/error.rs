//! Errors shared by the pipeline and its stores.

use thiserror::Error;
use uuid::Uuid;

/// Failure of a store operation or a record state transition.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No event has this id.
    #[error("event {0} not found")]
    NotFound(Uuid),

    /// The event already left the `unprocessed` state.
    #[error("event {0} is already processed")]
    AlreadyProcessed(Uuid),

    /// A stored or supplied value is outside its allowed set.
    #[error("invalid value: {0}")]
    Validation(String),

    /// The backing store failed or rejected the write.
    #[error("storage failure: {0}")]
    Infrastructure(String),
}
