//! Pure domain logic: normalization, signatures and the routing table.

pub mod normalizer;
pub mod routing;
pub mod signature;
