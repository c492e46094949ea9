//! Module: query::predicate
//! Responsibility: the backend-agnostic predicate AST and its text form.
//! Does not own: interpretation, which belongs to backends.
//! Boundary: trees are never mutated after construction; larger ones come from composition.

mod parse;


use crate::{db::query::expr::Expression, error::PredicateFormatError, value::Value};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::{BitAnd, BitOr, Not},
    str::FromStr,
};

bitflags! {
    ///
    /// ComparisonOptions
    ///
    /// Composable comparison modifiers. The default (empty set) is case- and
    /// diacritic-sensitive. Exact semantics are backend-mapped.
    ///

    #[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
    pub struct ComparisonOptions: u8 {
        const CASE_INSENSITIVE = 0b0001;
        const DIACRITIC_INSENSITIVE = 0b0010;
        const NORMALIZED = 0b0100;
    }
}

impl ComparisonOptions {
    /// Render the `[cdn]` modifier suffix used in predicate-format text.
    #[must_use]
    pub fn modifier(self) -> String {
        if self.is_empty() {
            return String::new();
        }

        let mut out = String::from("[");
        if self.contains(Self::CASE_INSENSITIVE) {
            out.push('c');
        }
        if self.contains(Self::DIACRITIC_INSENSITIVE) {
            out.push('d');
        }
        if self.contains(Self::NORMALIZED) {
            out.push('n');
        }
        out.push(']');

        out
    }
}

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[repr(u8)]
pub enum CompareOp {
    Eq = 0x01,
    Ne = 0x02,
    Lt = 0x03,
    Lte = 0x04,
    Gt = 0x05,
    Gte = 0x06,
    In = 0x07,
    Contains = 0x08,
    BeginsWith = 0x09,
    EndsWith = 0x0a,
    Like = 0x0b,
    Matches = 0x0c,
}

impl CompareOp {
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Operator token as written in predicate-format text.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::In => "IN",
            Self::Contains => "CONTAINS",
            Self::BeginsWith => "BEGINSWITH",
            Self::EndsWith => "ENDSWITH",
            Self::Like => "LIKE",
            Self::Matches => "MATCHES",
        }
    }
}

///
/// ComparisonPredicate
///
/// Leaf comparison: `left op[options] right`.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ComparisonPredicate {
    pub left: Expression,
    pub op: CompareOp,
    pub right: Expression,
    pub options: ComparisonOptions,
}

impl ComparisonPredicate {
    #[must_use]
    pub const fn new(left: Expression, op: CompareOp, right: Expression) -> Self {
        Self {
            left,
            op,
            right,
            options: ComparisonOptions::empty(),
        }
    }

    /// Add comparison modifiers; flags accumulate across calls.
    #[must_use]
    pub fn options(mut self, options: ComparisonOptions) -> Self {
        self.options |= options;
        self
    }

    #[must_use]
    pub fn case_insensitive(self) -> Self {
        self.options(ComparisonOptions::CASE_INSENSITIVE)
    }

    #[must_use]
    pub fn diacritic_insensitive(self) -> Self {
        self.options(ComparisonOptions::DIACRITIC_INSENSITIVE)
    }
}

impl fmt::Display for ComparisonPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{} {}",
            self.left,
            self.op.symbol(),
            self.options.modifier(),
            self.right
        )
    }
}

///
/// Predicate
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Predicate {
    True,
    False,
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Compare(ComparisonPredicate),
}

impl Predicate {
    #[must_use]
    pub const fn and(preds: Vec<Self>) -> Self {
        Self::And(preds)
    }

    #[must_use]
    pub const fn or(preds: Vec<Self>) -> Self {
        Self::Or(preds)
    }

    #[must_use]
    pub fn not(pred: impl Into<Self>) -> Self {
        Self::Not(Box::new(pred.into()))
    }

    /// Parse predicate-format text with positional arguments.
    ///
    /// Accepts the text `Display` writes. Each `%@` takes the next argument
    /// as a constant and each `%K` takes the next argument as a key path.
    /// A `{..}` literal always reads back as an aggregate expression.
    pub fn from_format<I>(format: &str, arguments: I) -> Result<Self, PredicateFormatError>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        parse::parse(format, arguments.into_iter().map(Into::into).collect())
    }

    /// Conjoin an ordered predicate list into at most one predicate.
    ///
    /// Empty → `None`, one → itself, many → a single `And` in list order.
    #[must_use]
    pub fn conjoin(preds: &[Self]) -> Option<Self> {
        match preds {
            [] => None,
            [only] => Some(only.clone()),
            many => Some(Self::And(many.to_vec())),
        }
    }
}

impl FromStr for Predicate {
    type Err = PredicateFormatError;

    fn from_str(format: &str) -> Result<Self, Self::Err> {
        Self::from_format(format, std::iter::empty::<Value>())
    }
}

impl From<ComparisonPredicate> for Predicate {
    fn from(cmp: ComparisonPredicate) -> Self {
        Self::Compare(cmp)
    }
}

impl From<bool> for Predicate {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => f.write_str("TRUEPREDICATE"),
            Self::False => f.write_str("FALSEPREDICATE"),
            Self::And(preds) => write_compound(f, "AND", preds, Self::True),
            Self::Or(preds) => write_compound(f, "OR", preds, Self::False),
            Self::Not(pred) => write!(f, "NOT ({pred})"),
            Self::Compare(cmp) => write!(f, "{cmp}"),
        }
    }
}

fn write_compound(
    f: &mut fmt::Formatter<'_>,
    joiner: &str,
    preds: &[Predicate],
    empty: Predicate,
) -> fmt::Result {
    match preds {
        [] => write!(f, "{empty}"),
        [only] => write!(f, "{only}"),
        many => {
            for (i, pred) in many.iter().enumerate() {
                if i > 0 {
                    write!(f, " {joiner} ")?;
                }
                write!(f, "({pred})")?;
            }
            Ok(())
        }
    }
}

// ----------------------------------------------------------------------
// Operators
// ----------------------------------------------------------------------

impl<R: Into<Self>> BitAnd<R> for Predicate {
    type Output = Self;

    fn bitand(self, rhs: R) -> Self::Output {
        Self::And(vec![self, rhs.into()])
    }
}

impl<R: Into<Self>> BitOr<R> for Predicate {
    type Output = Self;

    fn bitor(self, rhs: R) -> Self::Output {
        Self::Or(vec![self, rhs.into()])
    }
}

impl Not for Predicate {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::Not(Box::new(self))
    }
}

impl<R: Into<Predicate>> BitAnd<R> for ComparisonPredicate {
    type Output = Predicate;

    fn bitand(self, rhs: R) -> Self::Output {
        Predicate::And(vec![self.into(), rhs.into()])
    }
}

impl<R: Into<Predicate>> BitOr<R> for ComparisonPredicate {
    type Output = Predicate;

    fn bitor(self, rhs: R) -> Self::Output {
        Predicate::Or(vec![self.into(), rhs.into()])
    }
}

impl Not for ComparisonPredicate {
    type Output = Predicate;

    fn not(self) -> Self::Output {
        Predicate::Not(Box::new(self.into()))
    }
}
