//! Core runtime for Quarry: attribute paths, the expression and predicate
//! algebra, the typed query builder, and the backend execution boundary.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod db;
pub mod error;
pub mod model;
pub mod obs;
pub mod traits;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, executors, stores, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::query::{
            ComparisonOptions, ExpressionConvertible as _, ExpressionDescription, Predicate,
            SortDescriptor,
        },
        model::path::AttributePath,
        traits::{Entity, EntityAttribute, FieldValue as _},
        value::{Dictionary, Value},
    };
}
