//! Tally Core: shared record types and storage abstractions.
//!
//! This crate defines the two persisted record kinds (events and metric
//! observations), the traits the pipeline needs from storage, and the
//! error type shared by every layer. It contains no infrastructure code.

pub mod clock;
pub mod error;
pub mod event;
pub mod metric;
pub mod repository;
pub mod subscription;
