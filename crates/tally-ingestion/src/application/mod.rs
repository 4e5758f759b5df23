//! Application services that combine domain logic with storage.

pub mod aggregation;
pub mod dispatcher;
pub mod ingestion;
pub mod query_handlers;
