use crate::db::request::ResultType;
use std::fmt;
use thiserror::Error as ThisError;

///
/// ErrorClass
///
/// Stable classification for backend failures.
/// Backends pick the class; the core never reinterprets it.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorClass {
    /// The store or session could not be reached.
    Unavailable,

    /// The backend does not support a requested feature.
    Unsupported,

    /// The translated request was rejected (malformed predicate, unknown entity).
    InvalidRequest,

    /// Stored data violated backend invariants.
    Corruption,

    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unavailable => "unavailable",
            Self::Unsupported => "unsupported",
            Self::InvalidRequest => "invalid_request",
            Self::Corruption => "corruption",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// BackendError
///
/// Structured failure reported by a persistence backend.
/// Propagated verbatim through `QueryError::Backend`; never retried.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{class}: {message}")]
pub struct BackendError {
    pub class: ErrorClass,
    pub message: String,
}

impl BackendError {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unavailable, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidRequest, message)
    }

    pub fn corruption(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Corruption, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, message)
    }
}

///
/// PredicateFormatError
///
/// Predicate-format text that could not be parsed or bound to its arguments.
/// Positions are byte offsets into the format string.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum PredicateFormatError {
    #[error("invalid predicate format at byte {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("placeholder {index} has no argument ({given} given)")]
    MissingArgument { index: usize, given: usize },

    #[error("predicate format used {used} of {given} arguments")]
    UnusedArguments { used: usize, given: usize },

    #[error("%K argument {index} must be text, found {found}")]
    KeyArgument { index: usize, found: &'static str },
}

///
/// QueryError
///
/// Everything that can go wrong while executing a query.
/// Construction only fails through `filter_format`.
///

#[derive(Debug, ThisError)]
pub enum QueryError {
    #[error(
        "no execution context for '{entity}': none given, none set on the query, no backend default"
    )]
    UnresolvedContext { entity: &'static str },

    #[error("{0}")]
    Backend(#[from] BackendError),

    #[error("{0}")]
    PredicateFormat(#[from] PredicateFormatError),

    #[error("column '{column}' holds {found}, which cannot be read as {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("backend returned a row that does not match result type {expected}")]
    UnexpectedRow { expected: ResultType },

    #[error("query invariant violated: {0}")]
    InvariantViolation(String),
}

impl QueryError {
    /// Construct a query-origin invariant violation.
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    /// Return the backend error class, if this error came from the backend.
    #[must_use]
    pub const fn backend_class(&self) -> Option<ErrorClass> {
        match self {
            Self::Backend(err) => Some(err.class),
            _ => None,
        }
    }
}
