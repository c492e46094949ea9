//! ## Crate layout
//! - `core`: attribute paths, expressions, predicates, the query builder,
//!   the backend contract, the in-memory backend, and observability.
//!
//! The `prelude` module carries the vocabulary used when writing queries;
//! backends and error types are reached through `core` or the top-level
//! re-exports.

pub use quarry_core as core;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//
// Re-exports
//

pub use crate::core::{
    db::{
        Backend, FetchRequest, FetchRow, RequestDescription, RequestFingerprint, ResultType,
        Session,
        memory::{MemoryBackend, MemoryContext, MemoryObject},
        query::{Query, QueryBuilder},
    },
    error::{BackendError, ErrorClass, PredicateFormatError, QueryError},
    obs,
};

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::{
        db::{
            Session,
            query::{
                ComparisonOptions, ExpressionConvertible as _, ExpressionDescription,
                KeyPathConvertible as _, Predicate, PropertyConvertible as _, SortDescriptor,
                SortDescriptorConvertible as _,
            },
        },
        model::path::AttributePath,
        traits::{Entity, EntityAttribute, FieldValue as _},
        value::{Dictionary, Value},
    };
}
