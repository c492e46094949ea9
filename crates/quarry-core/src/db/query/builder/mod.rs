//! Module: query::builder
//! Responsibility: immutable accumulation of fetch-request state.
//! Does not own: result-shape typing (see `fluent`) or backend translation.
//! Boundary: pure value transformations; nothing here can fail.

mod query;


// re-exports
pub use query::QueryBuilder;
