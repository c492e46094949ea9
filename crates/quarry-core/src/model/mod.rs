//! Entity-side vocabulary consumed by queries.

pub mod path;
