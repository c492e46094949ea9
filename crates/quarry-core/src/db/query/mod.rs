//! Module: db::query
//! Responsibility: the query-construction surface, from expressions up to
//! the shape-typed fluent query.
//! Does not own: backend translation or execution.

pub mod builder;
pub mod expr;
pub mod fluent;
pub mod predicate;
pub mod shape;

// re-exports
pub use crate::db::request::{
    Property, PropertyConvertible, SortDescriptor, SortDescriptorConvertible,
};
pub use builder::QueryBuilder;
pub use expr::{
    AttributeType, Expression, ExpressionConvertible, ExpressionDescription, Function,
    IntoOperand, KeyPathConvertible, Operand,
};
pub use fluent::Query;
pub use predicate::{CompareOp, ComparisonOptions, ComparisonPredicate, Predicate};
pub use shape::{Dictionaries, Ids, Objects, ResultShape};
