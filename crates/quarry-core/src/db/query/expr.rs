//! Module: query::expr
//! Responsibility: typed expressions, operand resolution, and comparison builders.
//! Does not own: predicate composition or request translation.
//! Boundary: the expression algebra every predicate leaf and projection is built from.

use crate::{
    db::query::predicate::{CompareOp, ComparisonPredicate},
    traits::{EntityAttribute, FieldValue},
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// Expression
///
/// Immutable expression tree. Every variant renders to predicate-format text
/// via `Display`, which is also what request descriptions carry.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Expression {
    /// Dotted attribute key path; the empty key denotes the evaluated object.
    KeyPath(String),

    Constant(Value),

    /// Collection literal, e.g. the right-hand side of `IN`.
    Aggregate(Vec<Self>),

    Function {
        function: Function,
        arguments: Vec<Self>,
    },
}

impl Expression {
    #[must_use]
    pub fn key_path(key: impl Into<String>) -> Self {
        Self::KeyPath(key.into())
    }

    #[must_use]
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(value.into())
    }

    #[must_use]
    pub fn function(function: Function, argument: impl ExpressionConvertible) -> Self {
        Self::Function {
            function,
            arguments: vec![argument.expression()],
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyPath(key) if key.is_empty() => f.write_str("SELF"),
            Self::KeyPath(key) => f.write_str(key),
            Self::Constant(value) => write!(f, "{value}"),
            Self::Aggregate(items) => {
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("}")
            }
            Self::Function {
                function,
                arguments,
            } => {
                write!(f, "{}(", function.selector())?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{argument}")?;
                }
                f.write_str(")")
            }
        }
    }
}

///
/// Function
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Function {
    Sum,
    Average,
    Min,
    Max,
    Count,
}

impl Function {
    /// Selector name as written in predicate-format text.
    #[must_use]
    pub const fn selector(self) -> &'static str {
        match self {
            Self::Sum => "sum:",
            Self::Average => "average:",
            Self::Min => "min:",
            Self::Max => "max:",
            Self::Count => "count:",
        }
    }

    /// Result type reported when an aggregate borrows its attribute's name.
    ///
    /// `Undefined` leaves the choice to the backend's schema.
    #[must_use]
    pub const fn default_result_type(self) -> AttributeType {
        match self {
            Self::Count => AttributeType::Integer64,
            Self::Average => AttributeType::Double,
            Self::Sum | Self::Min | Self::Max => AttributeType::Undefined,
        }
    }
}

///
/// AttributeType
///
/// Declared result type of a named projection expression.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum AttributeType {
    #[default]
    Undefined,
    Integer16,
    Integer32,
    Integer64,
    Decimal,
    Double,
    Float,
    String,
    Boolean,
    Date,
    Binary,
    ObjectId,
}

///
/// ExpressionDescription
///
/// Named, typed projection expression (a computed dictionary column).
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ExpressionDescription {
    pub name: String,
    pub expression: Expression,
    pub result_type: AttributeType,
}

impl ExpressionDescription {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        expression: impl ExpressionConvertible,
        result_type: AttributeType,
    ) -> Self {
        Self {
            name: name.into(),
            expression: expression.expression(),
            result_type,
        }
    }

    /// Aggregate over a named attribute.
    ///
    /// Without an explicit `name` the column is named after the attribute's
    /// key path.
    #[must_use]
    pub fn aggregate(
        function: Function,
        attribute: impl KeyPathConvertible,
        name: Option<&str>,
    ) -> Self {
        let key = attribute.key_path();

        Self {
            name: name.map_or_else(|| key.clone(), str::to_string),
            expression: Expression::Function {
                function,
                arguments: vec![Expression::KeyPath(key)],
            },
            result_type: function.default_result_type(),
        }
    }

    /// Aggregate over an arbitrary expression.
    ///
    /// There is no attribute to borrow a name from, so name and result type
    /// are explicit.
    #[must_use]
    pub fn aggregate_of(
        function: Function,
        expression: impl ExpressionConvertible,
        name: impl Into<String>,
        result_type: AttributeType,
    ) -> Self {
        Self {
            name: name.into(),
            expression: Expression::function(function, expression),
            result_type,
        }
    }

    #[must_use]
    pub fn sum(attribute: impl KeyPathConvertible, name: Option<&str>) -> Self {
        Self::aggregate(Function::Sum, attribute, name)
    }

    #[must_use]
    pub fn average(attribute: impl KeyPathConvertible, name: Option<&str>) -> Self {
        Self::aggregate(Function::Average, attribute, name)
    }

    #[must_use]
    pub fn min(attribute: impl KeyPathConvertible, name: Option<&str>) -> Self {
        Self::aggregate(Function::Min, attribute, name)
    }

    #[must_use]
    pub fn max(attribute: impl KeyPathConvertible, name: Option<&str>) -> Self {
        Self::aggregate(Function::Max, attribute, name)
    }

    #[must_use]
    pub fn count(attribute: impl KeyPathConvertible, name: Option<&str>) -> Self {
        Self::aggregate(Function::Count, attribute, name)
    }

    #[must_use]
    pub fn sum_of(
        expression: impl ExpressionConvertible,
        name: impl Into<String>,
        result_type: AttributeType,
    ) -> Self {
        Self::aggregate_of(Function::Sum, expression, name, result_type)
    }

    #[must_use]
    pub fn average_of(
        expression: impl ExpressionConvertible,
        name: impl Into<String>,
        result_type: AttributeType,
    ) -> Self {
        Self::aggregate_of(Function::Average, expression, name, result_type)
    }

    #[must_use]
    pub fn min_of(
        expression: impl ExpressionConvertible,
        name: impl Into<String>,
        result_type: AttributeType,
    ) -> Self {
        Self::aggregate_of(Function::Min, expression, name, result_type)
    }

    #[must_use]
    pub fn max_of(
        expression: impl ExpressionConvertible,
        name: impl Into<String>,
        result_type: AttributeType,
    ) -> Self {
        Self::aggregate_of(Function::Max, expression, name, result_type)
    }

    #[must_use]
    pub fn count_of(
        expression: impl ExpressionConvertible,
        name: impl Into<String>,
        result_type: AttributeType,
    ) -> Self {
        Self::aggregate_of(Function::Count, expression, name, result_type)
    }
}

// ----------------------------------------------------------------------
// Key paths
// ----------------------------------------------------------------------

///
/// KeyPathConvertible
///
/// Anything that names an attribute by dotted key path: attribute paths,
/// typed entity attributes, and plain strings.
///

pub trait KeyPathConvertible {
    fn key_path(&self) -> String;
}

impl<A: EntityAttribute> KeyPathConvertible for A {
    fn key_path(&self) -> String {
        self.path().key().to_string()
    }
}

impl KeyPathConvertible for &str {
    fn key_path(&self) -> String {
        (*self).to_string()
    }
}

impl KeyPathConvertible for String {
    fn key_path(&self) -> String {
        self.clone()
    }
}

// ----------------------------------------------------------------------
// Operands
// ----------------------------------------------------------------------

///
/// Operand
///
/// Right-hand side of a comparison, resolved explicitly: expression-like
/// inputs keep their expression form, everything else becomes a constant.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Expression(Expression),
    Literal(Value),
}

impl Operand {
    #[must_use]
    pub fn into_expression(self) -> Expression {
        match self {
            Self::Expression(expression) => expression,
            Self::Literal(value) => Expression::Constant(value),
        }
    }
}

///
/// IntoOperand
///

pub trait IntoOperand {
    fn into_operand(self) -> Operand;
}

impl<T: ExpressionConvertible> IntoOperand for T {
    fn into_operand(self) -> Operand {
        Operand::Expression(self.expression())
    }
}

impl IntoOperand for Operand {
    fn into_operand(self) -> Operand {
        self
    }
}

impl IntoOperand for Value {
    fn into_operand(self) -> Operand {
        Operand::Literal(self)
    }
}

impl<T: FieldValue> IntoOperand for Option<T> {
    fn into_operand(self) -> Operand {
        Operand::Literal(self.to_value())
    }
}

impl<T: FieldValue> IntoOperand for Vec<T> {
    fn into_operand(self) -> Operand {
        Operand::Literal(self.to_value())
    }
}

macro_rules! impl_literal_operand {
    ( $( $ty:ty ),* $(,)? ) => {
        $(
            impl IntoOperand for $ty {
                fn into_operand(self) -> Operand {
                    Operand::Literal(self.to_value())
                }
            }
        )*
    };
}

impl_literal_operand!(bool, &str, String, f32, f64, i8, i16, i32, i64, u8, u16, u32, u64);

// ----------------------------------------------------------------------
// Comparison builders
// ----------------------------------------------------------------------

///
/// ExpressionConvertible
///
/// Left-hand side of the comparison algebra. Every builder produces a
/// `ComparisonPredicate` with default (sensitive) options; refine with
/// `ComparisonPredicate::options`.
///

pub trait ExpressionConvertible {
    fn expression(&self) -> Expression;

    #[must_use]
    fn compare(&self, op: CompareOp, rhs: impl IntoOperand) -> ComparisonPredicate
    where
        Self: Sized,
    {
        ComparisonPredicate::new(self.expression(), op, rhs.into_operand().into_expression())
    }

    #[must_use]
    fn equal_to(&self, rhs: impl IntoOperand) -> ComparisonPredicate
    where
        Self: Sized,
    {
        self.compare(CompareOp::Eq, rhs)
    }

    #[must_use]
    fn not_equal_to(&self, rhs: impl IntoOperand) -> ComparisonPredicate
    where
        Self: Sized,
    {
        self.compare(CompareOp::Ne, rhs)
    }

    #[must_use]
    fn greater_than(&self, rhs: impl IntoOperand) -> ComparisonPredicate
    where
        Self: Sized,
    {
        self.compare(CompareOp::Gt, rhs)
    }

    #[must_use]
    fn greater_than_or_equal_to(&self, rhs: impl IntoOperand) -> ComparisonPredicate
    where
        Self: Sized,
    {
        self.compare(CompareOp::Gte, rhs)
    }

    #[must_use]
    fn less_than(&self, rhs: impl IntoOperand) -> ComparisonPredicate
    where
        Self: Sized,
    {
        self.compare(CompareOp::Lt, rhs)
    }

    #[must_use]
    fn less_than_or_equal_to(&self, rhs: impl IntoOperand) -> ComparisonPredicate
    where
        Self: Sized,
    {
        self.compare(CompareOp::Lte, rhs)
    }

    #[must_use]
    fn begins_with(&self, rhs: impl IntoOperand) -> ComparisonPredicate
    where
        Self: Sized,
    {
        self.compare(CompareOp::BeginsWith, rhs)
    }

    #[must_use]
    fn contains(&self, rhs: impl IntoOperand) -> ComparisonPredicate
    where
        Self: Sized,
    {
        self.compare(CompareOp::Contains, rhs)
    }

    #[must_use]
    fn ends_with(&self, rhs: impl IntoOperand) -> ComparisonPredicate
    where
        Self: Sized,
    {
        self.compare(CompareOp::EndsWith, rhs)
    }

    /// Wildcard match where only `*` and `?` are special.
    #[must_use]
    fn like(&self, rhs: impl IntoOperand) -> ComparisonPredicate
    where
        Self: Sized,
    {
        self.compare(CompareOp::Like, rhs)
    }

    /// Whole-value regular-expression match.
    #[must_use]
    fn matches(&self, rhs: impl IntoOperand) -> ComparisonPredicate
    where
        Self: Sized,
    {
        self.compare(CompareOp::Matches, rhs)
    }

    /// Membership in a fixed set of constants.
    #[must_use]
    fn among<I, V>(&self, values: I) -> ComparisonPredicate
    where
        Self: Sized,
        I: IntoIterator<Item = V>,
        V: FieldValue,
    {
        let set = Expression::Aggregate(
            values
                .into_iter()
                .map(|value| Expression::Constant(value.to_value()))
                .collect(),
        );

        self.compare(CompareOp::In, Operand::Expression(set))
    }
}

impl<A: EntityAttribute> ExpressionConvertible for A {
    fn expression(&self) -> Expression {
        Expression::KeyPath(self.path().key().to_string())
    }
}

impl ExpressionConvertible for Expression {
    fn expression(&self) -> Expression {
        self.clone()
    }
}

impl ExpressionConvertible for ExpressionDescription {
    fn expression(&self) -> Expression {
        self.expression.clone()
    }
}
