mod compare;
mod dictionary;


use serde::{Deserialize, Serialize};
use std::fmt;

// re-exports
pub use compare::{canonical_cmp, numeric_cmp, strict_ordering};
pub use dictionary::Dictionary;

///
/// Value
///
/// Runtime value carried by predicate constants and projected columns.
///
/// Null      → absent value (stores may also omit the key entirely).
/// ObjectId  → opaque backend object identifier, e.g. a projected relationship.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Value {
    Blob(Vec<u8>),
    Bool(bool),
    Float(f64),
    Int(i64),
    /// Ordered list of values.
    ///
    /// Used for `IN` right-hand sides and collection literals.
    List(Vec<Self>),
    Null,
    ObjectId(u64),
    Text(String),
    Uint(u64),
}

impl Value {
    /// Build a `Value::List` from owned items.
    pub fn from_list<T>(items: Vec<T>) -> Self
    where
        T: Into<Self>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Float(_) | Self::Int(_) | Self::Uint(_))
    }

    #[must_use]
    pub const fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Widen a numeric value to `f64` for mixed-kind arithmetic.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::Uint(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Stable, human-readable variant label used in error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Blob(_) => "blob",
            Self::Bool(_) => "bool",
            Self::Float(_) => "float",
            Self::Int(_) => "int",
            Self::List(_) => "list",
            Self::Null => "null",
            Self::ObjectId(_) => "object id",
            Self::Text(_) => "text",
            Self::Uint(_) => "uint",
        }
    }
}

// Renders the predicate-format literal form.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blob(bytes) => {
                write!(f, "<")?;
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                write!(f, ">")
            }
            Self::Bool(true) => write!(f, "YES"),
            Self::Bool(false) => write!(f, "NO"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::List(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
            Self::Null => write!(f, "nil"),
            Self::ObjectId(id) => write!(f, "<x-object/{id}>"),
            Self::Text(text) => {
                write!(f, "\"")?;
                for ch in text.chars() {
                    match ch {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        _ => write!(f, "{ch}")?,
                    }
                }
                write!(f, "\"")
            }
            Self::Uint(v) => write!(f, "{v}"),
        }
    }
}

///
/// From conversions
///

macro_rules! impl_value_from {
    ( $( $variant:ident => $($ty:ty),+ );* $(;)? ) => {
        $(
            $(
                impl From<$ty> for Value {
                    fn from(v: $ty) -> Self {
                        Self::$variant(v.into())
                    }
                }
            )+
        )*
    };
}

impl_value_from! {
    Bool => bool;
    Float => f32, f64;
    Int => i8, i16, i32, i64;
    Text => String, &str;
    Uint => u8, u16, u32, u64;
}

impl From<Vec<Self>> for Value {
    fn from(items: Vec<Self>) -> Self {
        Self::List(items)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
