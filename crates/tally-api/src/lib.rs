//! Tally API: HTTP surface of the event ingestion pipeline.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;
pub mod subscription;
