//! Tally: event ingestion pipeline.
//!
//! Accepts inbound webhook events in two wire shapes, normalizes them,
//! persists them, routes each to the metric emissions registered for its
//! (category, type) pair, and answers sum queries over the resulting
//! observations.

pub mod application;
pub mod domain;
